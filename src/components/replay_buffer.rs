use {
    super::Memory,
    candle_core::{
        bail,
        Result,
        Tensor,
    },
    rand::{
        distributions::Uniform,
        thread_rng,
        Rng,
    },
    std::collections::VecDeque,
    unzip_n::unzip_n,
};

unzip_n!(5);

/// A transition in the replay buffer.
///
/// Every field has a leading agent axis.
///
/// # Fields
///
/// * `state` - The state tensor, `(n_agents, size_state)`.
/// * `action` - The action tensor, `(n_agents, size_action)`.
/// * `reward` - The reward tensor, `(n_agents, 1)`.
/// * `next_state` - The next state tensor, `(n_agents, size_state)`.
/// * `done` - The done flags as 0.0 / 1.0, `(n_agents, 1)`.
#[derive(Clone, Debug)]
pub struct Transition {
    pub state: Tensor,
    pub action: Tensor,
    pub reward: Tensor,
    pub next_state: Tensor,
    pub done: Tensor,
}
impl Transition {
    pub fn new(
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        done: &Tensor,
    ) -> Self {
        Self {
            state: state.detach(),
            action: action.detach(),
            reward: reward.detach(),
            next_state: next_state.detach(),
            done: done.detach(),
        }
    }
}

/// A batch of transitions, every field shaped `(n_agents, batch_size, dim)`.
#[derive(Clone, Debug)]
pub struct Batch {
    pub states: Tensor,
    pub actions: Tensor,
    pub rewards: Tensor,
    pub next_states: Tensor,
    pub dones: Tensor,
}

/// The slice of a [`Batch`] belonging to one agent, shaped `(batch_size, dim)`.
#[derive(Clone, Debug)]
pub struct Experiences {
    pub states: Tensor,
    pub actions: Tensor,
    pub rewards: Tensor,
    pub next_states: Tensor,
    pub dones: Tensor,
}

impl Batch {
    pub fn num_agents(&self) -> Result<usize> {
        self.states.dim(0)
    }

    pub fn batch_size(&self) -> Result<usize> {
        self.states.dim(1)
    }

    pub fn agent(
        &self,
        i: usize,
    ) -> Result<Experiences> {
        Ok(Experiences {
            states: self.states.get(i)?,
            actions: self.actions.get(i)?,
            rewards: self.rewards.get(i)?,
            next_states: self.next_states.get(i)?,
            dones: self.dones.get(i)?,
        })
    }
}

/// Merge the agent axis into the feature axis: `(n, b, d) -> (b, n * d)`.
///
/// Row `k` of the result holds agent 0's features of sample `k`, followed by
/// agent 1's, and so on.
pub fn flatten_agents(xs: &Tensor) -> Result<Tensor> {
    let (n_agents, batch_size, dim) = xs.dims3()?;
    xs.transpose(0, 1)?
        .contiguous()?
        .reshape((batch_size, n_agents * dim))
}

/// A replay buffer for off-policy algorithms.
///
/// The replay buffer is implemented as a simple ring buffer / VecDeque.
///
/// # Fields
///
/// * `buffer` - The buffer of transitions.
/// * `capacity` - The capacity of the buffer.
/// * `batch_size` - The number of transitions returned by `sample`.
#[derive(Clone)]
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
    batch_size: usize,
}
impl ReplayBuffer {
    /// Create a new replay buffer with the given capacity.
    pub fn new(
        capacity: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            batch_size,
        }
    }

    /// Check if the buffer is full.
    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push a transition into the buffer.
    ///
    /// If the buffer is full, the oldest transition is removed to make room for
    /// the new transition.
    pub fn push(
        &mut self,
        transition: Transition,
    ) {
        if self.capacity == 0 {
            return;
        }
        if self.is_full() {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Sample a random batch of transitions from the buffer, with replacement.
    ///
    /// When the size of the buffer is less than the batch size, `None` is returned.
    pub fn random_batch(
        &self,
        batch_size: usize,
    ) -> Result<Option<Batch>> {
        if self.buffer.is_empty() || self.buffer.len() < batch_size {
            return Ok(None);
        }

        let (states, actions, rewards, next_states, dones) = thread_rng()
            .sample_iter(Uniform::from(0..self.buffer.len()))
            .take(batch_size)
            .map(|i| {
                let t = &self.buffer[i];
                (
                    t.state.clone(),
                    t.action.clone(),
                    t.reward.clone(),
                    t.next_state.clone(),
                    t.done.clone(),
                )
            })
            .unzip_n_vec();

        Ok(Some(Batch {
            states: Tensor::stack(&states, 1)?,
            actions: Tensor::stack(&actions, 1)?,
            rewards: Tensor::stack(&rewards, 1)?,
            next_states: Tensor::stack(&next_states, 1)?,
            dones: Tensor::stack(&dones, 1)?,
        }))
    }
}

impl Memory for ReplayBuffer {
    fn add(&mut self, transition: Transition) {
        self.push(transition)
    }

    fn sample(&mut self) -> Result<Batch> {
        match self.random_batch(self.batch_size)? {
            Some(batch) => Ok(batch),
            None => bail!(
                "cannot sample {} transitions from a buffer holding {}",
                self.batch_size,
                self.buffer.len(),
            ),
        }
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }
}
