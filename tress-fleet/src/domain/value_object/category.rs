//! 垃圾分类值对象

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 垃圾桶分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Can,
    Plastic,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Can => "can",
            Category::Plastic => "plastic",
            Category::Other => "other",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "can" | "cans" => Ok(Category::Can),
            "plastic" | "plastics" => Ok(Category::Plastic),
            "other" | "others" | "general" => Ok(Category::Other),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
