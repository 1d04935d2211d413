use serde::{
    Deserialize,
    Serialize,
};


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    // The total number of episodes.
    max_episodes: usize,
    // Reset the environment in training mode (fast, no rendering).
    train_mode: bool,
    // Training stops once the mean score over this many episodes...
    solve_window: usize,
    // ...exceeds this threshold.
    solved_threshold: f64,
    // The rolling window used for progress reports.
    report_window: usize,
    // Episodes between two progress reports.
    report_every: usize,
}
impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            max_episodes: 5_000,
            train_mode: true,
            solve_window: 100,
            solved_threshold: 1.0,
            report_window: 20,
            report_every: 100,
        }
    }
}
impl TrainConfig {
    pub fn new(max_episodes: usize) -> Self {
        Self {
            max_episodes,
            ..Default::default()
        }
    }
}

impl TrainConfig {
    pub fn max_episodes(&self) -> usize {
        self.max_episodes
    }
    pub fn train_mode(&self) -> bool {
        self.train_mode
    }
    pub fn solve_window(&self) -> usize {
        self.solve_window
    }
    pub fn solved_threshold(&self) -> f64 {
        self.solved_threshold
    }
    pub fn report_window(&self) -> usize {
        self.report_window
    }
    pub fn report_every(&self) -> usize {
        self.report_every
    }
    pub fn set_max_episodes(&mut self, max_episodes: usize) {
        self.max_episodes = max_episodes;
    }
    pub fn set_train_mode(&mut self, train_mode: bool) {
        self.train_mode = train_mode;
    }
    pub fn set_solve_window(&mut self, solve_window: usize) {
        self.solve_window = solve_window.max(1);
    }
    pub fn set_solved_threshold(&mut self, solved_threshold: f64) {
        self.solved_threshold = solved_threshold;
    }
    pub fn set_report_window(&mut self, report_window: usize) {
        self.report_window = report_window.max(1);
    }
    pub fn set_report_every(&mut self, report_every: usize) {
        self.report_every = report_every.max(1);
    }
}
