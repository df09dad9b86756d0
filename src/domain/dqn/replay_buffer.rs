use rand::Rng;
use rand::seq::index;
use std::collections::VecDeque;

/// One observed decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Vec<f32>,
}

/// Fixed capacity experience store. When full, `push` evicts the oldest transition.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    memory: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        ReplayBuffer { memory: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.memory.len() >= self.capacity {
            self.memory.pop_front();
        }
        self.memory.push_back(transition);
    }

    /// Draws `batch_size` distinct transitions uniformly at random.
    ///
    /// # Returns
    /// `None` while fewer than `batch_size` transitions are held.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Option<Vec<&Transition>> {
        if batch_size > self.memory.len() {
            return None;
        }

        Some(index::sample(rng, self.memory.len(), batch_size).into_iter().map(|i| &self.memory[i]).collect())
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.memory.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn transition(action: usize) -> Transition {
        Transition { state: vec![0.0], action, reward: 0.0, next_state: vec![0.0] }
    }

    #[test]
    fn oldest_transition_is_evicted() {
        let mut buffer = ReplayBuffer::new(3);
        for action in 0..5 {
            buffer.push(transition(action));
        }

        let actions: Vec<usize> = buffer.iter().map(|t| t.action).collect();
        assert_eq!(actions, vec![2, 3, 4]);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn sampling_needs_enough_transitions() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut buffer = ReplayBuffer::new(10);
        buffer.push(transition(0));

        assert!(buffer.sample(2, &mut rng).is_none());
        assert_eq!(buffer.sample(1, &mut rng).map(|batch| batch.len()), Some(1));
    }

    #[test]
    fn sampling_is_without_replacement() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut buffer = ReplayBuffer::new(10);
        for action in 0..10 {
            buffer.push(transition(action));
        }

        let batch = buffer.sample(10, &mut rng).unwrap();
        let distinct: HashSet<usize> = batch.iter().map(|t| t.action).collect();

        assert_eq!(distinct.len(), 10);
    }
}
