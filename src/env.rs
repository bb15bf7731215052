//! Environment abstraction for self-play training.
//!
//! The chess engine itself lives behind the [`Environment`] trait; the
//! trainer only relies on the contract below. Implementations must
//! guarantee that any non-terminal position has at least one legal action.

/// Number of board feature planes in an observation.
pub const BOARD_PLANES: usize = 21;

/// Board width/height in squares.
pub const BOARD_SIZE: usize = 8;

/// Flat length of one observation: planes x height x width.
pub const OBS_LEN: usize = BOARD_PLANES * BOARD_SIZE * BOARD_SIZE;

/// Size of the discrete action space (from-square / to-square / promotion
/// combinations).
pub const ACTION_SPACE: usize = 4272;

/// Discrete action identifier in `0..ACTION_SPACE`.
pub type ActionId = u32;

/// A fixed-shape board observation: 21x8x8 feature planes, stored
/// row-major. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    data: Vec<f32>,
}

impl Observation {
    /// Wrap raw plane data.
    ///
    /// # Panics
    /// Panics if `data` does not have exactly [`OBS_LEN`] elements.
    pub fn new(data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            OBS_LEN,
            "observation must have {} elements, got {}",
            OBS_LEN,
            data.len()
        );
        Self { data }
    }

    /// An all-zero observation.
    pub fn zeros() -> Self {
        Self {
            data: vec![0.0; OBS_LEN],
        }
    }

    /// Flat plane data.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume into the flat plane data.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// Result of stepping the environment once.
#[derive(Debug, Clone)]
pub struct EnvStep {
    /// Observation after the move was applied.
    pub observation: Observation,
    /// Reward for the transition.
    pub reward: f32,
    /// Whether the game ended on this step.
    pub done: bool,
}

impl EnvStep {
    /// Create a new step result.
    pub fn new(observation: Observation, reward: f32, done: bool) -> Self {
        Self {
            observation,
            reward,
            done,
        }
    }
}

/// Contract the trainer expects from a chess environment.
pub trait Environment {
    /// Start a new game and return the initial observation.
    ///
    /// `randomize` asks the environment for a randomized opening position
    /// instead of the standard one; implementations are free to ignore it.
    fn reset(&mut self, randomize: bool) -> Observation;

    /// Apply one action and return the resulting transition.
    fn step(&mut self, action: ActionId) -> EnvStep;

    /// Ids of all actions that are legal in the current position.
    ///
    /// Must be non-empty whenever the game has not ended.
    fn legal_actions(&self) -> Vec<ActionId>;
}
