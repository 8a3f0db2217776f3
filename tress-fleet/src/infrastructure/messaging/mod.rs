pub mod memory_channel;
pub mod redis_channel;

pub use memory_channel::InMemoryTelemetryChannel;
pub use redis_channel::RedisTelemetryChannel;

/// 通配符匹配（`*` 匹配任意串，`?` 匹配单个字符），与 PSUBSCRIBE 语义一致
pub fn pattern_matches(pattern: &str, channel: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let c: Vec<char> = channel.chars().collect();

    let (mut pi, mut ci) = (0, 0);
    let mut star: Option<usize> = None;
    let mut resume = 0;

    while ci < c.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == c[ci]) {
            pi += 1;
            ci += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            resume = ci;
            pi += 1;
        } else if let Some(star_pi) = star {
            pi = star_pi + 1;
            resume += 1;
            ci = resume;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
