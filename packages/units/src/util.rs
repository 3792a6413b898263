use std::time::Duration;

/// A random number from the OS. Scheduling jitter only, so a failing source just means no jitter.
pub(crate) fn random_u32() -> u32 {
    let mut buf = [0u8; 4];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => u32::from_le_bytes(buf),
        Err(_) => 0,
    }
}

/// A random duration in `[0, max)`
pub(crate) fn random_duration(max: Duration) -> Duration {
    let millis = max.as_millis().min(u32::MAX as u128) as u32;
    if millis == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis((random_u32() % millis) as u64)
}

/// `base` deviated randomly by up to `percent` in either direction
pub(crate) fn jitter(base: Duration, percent: u32) -> Duration {
    let spread = base * percent / 100;
    base - spread + random_duration(spread * 2)
}

/// A random duration in `[min, max]`
pub(crate) fn random_between(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    min + random_duration(max - min + Duration::from_millis(1))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_jitter_bounds() {
        let base = Duration::from_secs(600);
        for _ in 0..100 {
            let d = jitter(base, 10);
            assert!(d >= Duration::from_secs(540) && d < Duration::from_secs(660));
        }
    }

    #[test]
    fn test_random_between() {
        let min = Duration::from_secs(1800);
        let max = Duration::from_secs(3600);
        for _ in 0..100 {
            let d = random_between(min, max);
            assert!(d >= min && d <= max);
        }
        assert_eq!(random_between(max, min), max);
    }
}
