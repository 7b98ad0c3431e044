use serde::{Deserialize, Serialize};

use crate::error::EnvError;

/// Grid sizes that have a registered environment id.
pub const REGISTERED_SIZES: [usize; 4] = [3, 5, 8, 20];

const ID_PREFIX: &str = "PutBallInBoxEnv";
const ID_SUFFIX: &str = "-v0";

/// Construction parameters for an [`Environment`](crate::Environment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvConfig {
    /// When true the initial state is sampled once and reused every episode.
    pub fixed_initial_state: bool,
    /// Grid `(width, height)`.
    pub space_size: (usize, usize),
}

impl Default for EnvConfig {
    fn default() -> Self {
        EnvConfig::fixed(8)
    }
}

impl EnvConfig {
    /// Creates a config for an arbitrary `width` x `height` grid.
    pub const fn new(fixed_initial_state: bool, width: usize, height: usize) -> Self {
        EnvConfig {
            fixed_initial_state,
            space_size: (width, height),
        }
    }

    /// Square grid, same initial state every episode.
    pub const fn fixed(size: usize) -> Self {
        EnvConfig::new(true, size, size)
    }

    /// Square grid, fresh initial state every episode after the first.
    pub const fn random(size: usize) -> Self {
        EnvConfig::new(false, size, size)
    }

    /// Grid width, the bound on `x`.
    #[inline]
    pub fn width(&self) -> usize {
        self.space_size.0
    }

    /// Grid height, the bound on `y`.
    #[inline]
    pub fn height(&self) -> usize {
        self.space_size.1
    }

    /// All registered presets, fixed variants first.
    pub fn presets() -> Vec<EnvConfig> {
        let fixed = REGISTERED_SIZES.iter().map(|&s| EnvConfig::fixed(s));
        let random = REGISTERED_SIZES.iter().map(|&s| EnvConfig::random(s));
        fixed.chain(random).collect()
    }

    /// Looks up a registered id such as `PutBallInBoxEnvRandom5x5-v0`.
    pub fn from_id(id: &str) -> Result<Self, EnvError> {
        EnvConfig::presets()
            .into_iter()
            .find(|config| config.id().as_deref() == Some(id))
            .ok_or_else(|| EnvError::UnknownEnvironment { id: id.to_string() })
    }

    /// Returns the registered id, or `None` for unregistered sizes.
    pub fn id(&self) -> Option<String> {
        let (width, height) = self.space_size;
        if width != height || !REGISTERED_SIZES.contains(&width) {
            return None;
        }
        let kind = if self.fixed_initial_state {
            "Fixed"
        } else {
            "Random"
        };
        Some(format!("{ID_PREFIX}{kind}{width}x{height}{ID_SUFFIX}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_ids_round_trip() {
        let presets = EnvConfig::presets();
        assert_eq!(presets.len(), 8);
        for config in presets {
            let id = config.id().unwrap();
            assert_eq!(EnvConfig::from_id(&id), Ok(config));
        }
    }

    #[test]
    fn test_known_ids() {
        assert_eq!(
            EnvConfig::from_id("PutBallInBoxEnvFixed8x8-v0"),
            Ok(EnvConfig::new(true, 8, 8))
        );
        assert_eq!(
            EnvConfig::from_id("PutBallInBoxEnvRandom20x20-v0"),
            Ok(EnvConfig::new(false, 20, 20))
        );
        assert_eq!(EnvConfig::default().id().as_deref(), Some("PutBallInBoxEnvFixed8x8-v0"));
    }

    #[test]
    fn test_unknown_ids() {
        for id in [
            "PutBallInBoxEnvFixed4x4-v0",
            "PutBallInBoxEnvFixed8x5-v0",
            "PutBallInBoxEnvSometimes8x8-v0",
            "PutBallInBoxEnvFixed8x8-v1",
            "PutBallInBoxEnvFixed+8x+8-v0",
            "PutBallInBoxEnvRandom05x005-v0",
            "CartPole-v1",
            "",
        ] {
            assert_eq!(
                EnvConfig::from_id(id),
                Err(EnvError::UnknownEnvironment { id: id.to_string() }),
                "{id}"
            );
        }
    }

    #[test]
    fn test_custom_size_has_no_id() {
        assert_eq!(EnvConfig::new(true, 4, 7).id(), None);
    }
}
