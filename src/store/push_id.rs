use std::sync::Mutex;

use rand::Rng;

/// ASCII-ordered so that generated keys sort lexicographically by time.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

/// Generates 20-character keys: 8 characters of millisecond timestamp
/// followed by 12 random characters. Keys created within the same
/// millisecond increment the random part, so ordering holds even then.
pub struct PushIdGenerator {
    state: Mutex<PushState>,
}

struct PushState {
    last_ms: i64,
    last_random: [u8; RANDOM_CHARS],
}

impl Default for PushIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PushIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PushState {
                last_ms: -1,
                last_random: [0; RANDOM_CHARS],
            }),
        }
    }

    pub fn generate(&self, now_ms: i64) -> String {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if now_ms == state.last_ms {
            increment(&mut state.last_random);
        } else {
            let mut rng = rand::thread_rng();
            for slot in state.last_random.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
            state.last_ms = now_ms;
        }

        let mut id = String::with_capacity(TIME_CHARS + RANDOM_CHARS);
        let mut time_part = [0u8; TIME_CHARS];
        let mut ms = now_ms.max(0);
        for slot in time_part.iter_mut().rev() {
            *slot = PUSH_CHARS[(ms % 64) as usize];
            ms /= 64;
        }
        id.extend(time_part.iter().map(|&b| b as char));
        id.extend(
            state
                .last_random
                .iter()
                .map(|&i| PUSH_CHARS[i as usize] as char),
        );
        id
    }
}

fn increment(digits: &mut [u8; RANDOM_CHARS]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_id_shape() {
        let generator = PushIdGenerator::new();
        let id = generator.generate(1_700_000_000_000);
        assert_eq!(id.len(), 20);
        assert!(id.bytes().all(|b| PUSH_CHARS.contains(&b)));
    }

    #[test]
    fn test_push_ids_sort_by_time() {
        let generator = PushIdGenerator::new();
        let earlier = generator.generate(1_000);
        let later = generator.generate(2_000);
        assert!(earlier < later);
    }

    #[test]
    fn test_same_millisecond_ids_are_increasing() {
        let generator = PushIdGenerator::new();
        let ids: Vec<String> = (0..100).map(|_| generator.generate(5_000)).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_increment_carries() {
        let mut digits = [63u8; RANDOM_CHARS];
        digits[0] = 0;
        increment(&mut digits);
        assert_eq!(digits[0], 1);
        assert!(digits[1..].iter().all(|&d| d == 0));
    }
}
