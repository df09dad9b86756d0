use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::config::Device;
use crate::domain::dqn::optimizer::AdamOptimizer;
use crate::error::{Error, Result};
use crate::loader::parser::{parse_json_file, write_json_file};

/// Gradients are clamped element-wise to `[-GRADIENT_CLIP_VALUE, GRADIENT_CLIP_VALUE]` before each update.
pub const GRADIENT_CLIP_VALUE: f32 = 1.0;

/// Fully connected layer, weights stored row-major as `[output][input]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub input_size: usize,
    pub output_size: usize,
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

impl DenseLayer {
    /// Uniform initialisation in `±1/√input_size`.
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (input_size.max(1) as f32).sqrt();
        let weights = (0..input_size * output_size).map(|_| rng.random_range(-bound..=bound)).collect();
        let biases = (0..output_size).map(|_| rng.random_range(-bound..=bound)).collect();

        DenseLayer { input_size, output_size, weights, biases }
    }

    pub fn zeros_like(other: &DenseLayer) -> Self {
        DenseLayer {
            input_size: other.input_size,
            output_size: other.output_size,
            weights: vec![0.0; other.weights.len()],
            biases: vec![0.0; other.biases.len()],
        }
    }

    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        (0..self.output_size)
            .map(|o| {
                let row = &self.weights[o * self.input_size..(o + 1) * self.input_size];
                row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + self.biases[o]
            })
            .collect()
    }

    /// Checks that the parameter vectors match the declared sizes.
    fn validate(&self, layer: usize) -> Result<()> {
        if self.weights.len() != self.input_size * self.output_size {
            return Err(Error::CorruptParameters {
                layer,
                reason: format!("{} weights for {}x{} connections", self.weights.len(), self.input_size, self.output_size),
            });
        }
        if self.biases.len() != self.output_size {
            return Err(Error::CorruptParameters { layer, reason: format!("{} biases for {} outputs", self.biases.len(), self.output_size) });
        }
        Ok(())
    }

    fn clamp_values(&mut self, limit: f32) {
        for value in self.weights.iter_mut().chain(self.biases.iter_mut()) {
            *value = value.clamp(-limit, limit);
        }
    }
}

/// One regression target: the value of `action` in `state` should move to `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample<'a> {
    pub state: &'a [f32],
    pub action: usize,
    pub target: f32,
}

/// Multi-layer perceptron estimating one value per action.
///
/// Hidden layers use ReLU, the output layer is linear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QNetwork {
    layers: Vec<DenseLayer>,
    #[serde(skip)]
    device: Device,
}

impl QNetwork {
    pub fn new<R: Rng + ?Sized>(state_size: usize, action_size: usize, hidden_layer_sizes: &[usize], device: Device, rng: &mut R) -> Self {
        let mut layers = Vec::with_capacity(hidden_layer_sizes.len() + 1);
        let mut input_size = state_size;

        for &hidden_size in hidden_layer_sizes {
            layers.push(DenseLayer::new(input_size, hidden_size, rng));
            input_size = hidden_size;
        }
        layers.push(DenseLayer::new(input_size, action_size, rng));

        QNetwork { layers, device }
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    /// Input size followed by the output size of every layer.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.layers.len() + 1);
        if let Some(first) = self.layers.first() {
            sizes.push(first.input_size);
        }
        sizes.extend(self.layers.iter().map(|layer| layer.output_size));
        sizes
    }

    pub fn action_size(&self) -> usize {
        self.layers.last().map_or(0, |layer| layer.output_size)
    }

    /// Estimated value of every action in `state`.
    pub fn predict(&self, state: &[f32]) -> Vec<f32> {
        self.forward_trace(state).pop().unwrap_or_default()
    }

    /// Index of the highest estimated value, the first one on ties.
    pub fn best_action(&self, state: &[f32]) -> usize {
        argmax(&self.predict(state))
    }

    /// Highest estimated value in `state`.
    pub fn max_value(&self, state: &[f32]) -> f32 {
        self.predict(state).into_iter().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Activations of every layer, starting with the input itself.
    fn forward_trace(&self, state: &[f32]) -> Vec<Vec<f32>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(state.to_vec());

        let last = self.layers.len().saturating_sub(1);
        for (index, layer) in self.layers.iter().enumerate() {
            let mut output = layer.forward(&activations[index]);
            if index < last {
                output.iter_mut().for_each(|value| *value = value.max(0.0));
            }
            activations.push(output);
        }

        activations
    }

    /// Accumulates the parameter gradients of one sample into `gradients`.
    fn backward(&self, activations: &[Vec<f32>], output_gradient: Vec<f32>, gradients: &mut [DenseLayer]) {
        let mut delta = output_gradient;

        for index in (0..self.layers.len()).rev() {
            let layer = &self.layers[index];
            let input = &activations[index];
            let gradient = &mut gradients[index];

            for o in 0..layer.output_size {
                if delta[o] == 0.0 {
                    continue;
                }
                gradient.biases[o] += delta[o];
                let row = &mut gradient.weights[o * layer.input_size..(o + 1) * layer.input_size];
                for (g, x) in row.iter_mut().zip(input) {
                    *g += delta[o] * x;
                }
            }

            if index == 0 {
                break;
            }

            // The input of this layer is the ReLU output of the previous one.
            let mut input_delta = vec![0.0f32; layer.input_size];
            for (i, value) in input_delta.iter_mut().enumerate() {
                if input[i] <= 0.0 {
                    continue;
                }
                *value = (0..layer.output_size).map(|o| layer.weights[o * layer.input_size + i] * delta[o]).sum();
            }
            delta = input_delta;
        }
    }

    /// One optimisation step on the mean Smooth-L1 loss of `samples`.
    ///
    /// Returns the loss before the update.
    pub fn fit_batch(&mut self, samples: &[TrainingSample<'_>], optimizer: &mut AdamOptimizer) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }

        let (gradients, loss) = self.clipped_gradients(samples);
        optimizer.step(&mut self.layers, &gradients);

        loss
    }

    /// Mean loss gradients of `samples`, clamped element-wise to `GRADIENT_CLIP_VALUE`, and the mean loss.
    pub(crate) fn clipped_gradients(&self, samples: &[TrainingSample<'_>]) -> (Vec<DenseLayer>, f32) {
        let mut gradients: Vec<DenseLayer> = self.layers.iter().map(DenseLayer::zeros_like).collect();
        if samples.is_empty() {
            return (gradients, 0.0);
        }

        let batch_size = samples.len() as f32;
        let mut loss = 0.0f32;

        for sample in samples {
            let activations = self.forward_trace(sample.state);
            let Some(output) = activations.last() else {
                continue;
            };

            let difference = output[sample.action] - sample.target;
            loss += smooth_l1(difference);

            let mut output_gradient = vec![0.0f32; output.len()];
            output_gradient[sample.action] = difference.clamp(-1.0, 1.0) / batch_size;

            self.backward(&activations, output_gradient, &mut gradients);
        }

        for gradient in gradients.iter_mut() {
            gradient.clamp_values(GRADIENT_CLIP_VALUE);
        }

        (gradients, loss / batch_size)
    }

    /// Hard copy of all parameters of `other`, which must be consistent and of the same shape.
    pub fn copy_parameters_from(&mut self, other: &QNetwork) -> Result<()> {
        other.validate()?;
        self.check_shape(&other.layer_sizes())?;
        self.layers.clone_from(&other.layers);
        Ok(())
    }

    pub fn save_parameters(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json_file(path, self)
    }

    /// Replaces all parameters with the ones stored at `path`.
    ///
    /// The stored layers must be internally consistent and their sizes must match this network.
    pub fn load_parameters(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let stored: QNetwork = parse_json_file(path)?;
        self.copy_parameters_from(&stored)
    }

    /// Vector lengths of every layer and the chaining of outputs into inputs.
    fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::CorruptParameters { layer: 0, reason: "no layers".to_string() });
        }

        for (index, layer) in self.layers.iter().enumerate() {
            layer.validate(index)?;
            if index > 0 && layer.input_size != self.layers[index - 1].output_size {
                return Err(Error::CorruptParameters {
                    layer: index,
                    reason: format!("{} inputs after a layer with {} outputs", layer.input_size, self.layers[index - 1].output_size),
                });
            }
        }
        Ok(())
    }

    fn check_shape(&self, found: &[usize]) -> Result<()> {
        let expected = self.layer_sizes();
        if expected != found {
            return Err(Error::ParameterShapeMismatch { expected, found: found.to_vec() });
        }
        Ok(())
    }
}

/// Huber loss with a threshold of 1.
pub fn smooth_l1(difference: f32) -> f32 {
    let abs = difference.abs();
    if abs < 1.0 { 0.5 * difference * difference } else { abs - 0.5 }
}

pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (index, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = index;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn network(seed: u64) -> QNetwork {
        let mut rng = StdRng::seed_from_u64(seed);
        QNetwork::new(4, 3, &[8, 8], Device::Cpu, &mut rng)
    }

    #[test]
    fn shapes_follow_configuration() {
        let net = network(1);

        assert_eq!(net.layer_sizes(), vec![4, 8, 8, 3]);
        assert_eq!(net.predict(&[0.1, 0.2, 0.3, 0.4]).len(), 3);
        assert_eq!(net.action_size(), 3);
    }

    #[test]
    fn initial_weights_are_bounded_by_fan_in() {
        let net = network(2);
        let bound = 1.0 / 4f32.sqrt();

        assert!(net.layers()[0].weights.iter().all(|w| w.abs() <= bound));
    }

    #[test]
    fn copied_network_predicts_identically() {
        let source = network(3);
        let mut copy = network(4);
        let state = [0.5, 0.25, 1.0, 0.0];
        assert_ne!(source.predict(&state), copy.predict(&state));

        copy.copy_parameters_from(&source).unwrap();

        assert_eq!(source.predict(&state), copy.predict(&state));
    }

    #[test]
    fn copy_between_different_shapes_fails() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut small = QNetwork::new(4, 3, &[2], Device::Cpu, &mut rng);

        let result = small.copy_parameters_from(&network(6));

        assert!(matches!(result, Err(Error::ParameterShapeMismatch { .. })));
    }

    #[test]
    fn fitting_moves_prediction_towards_target() {
        let mut net = network(7);
        let mut optimizer = AdamOptimizer::new(1e-3, net.layers());
        let state = [0.3, 0.6, 0.9, 0.1];
        let samples = [TrainingSample { state: &state, action: 1, target: 2.0 }];

        let initial_error = (net.predict(&state)[1] - 2.0).abs();
        for _ in 0..2000 {
            net.fit_batch(&samples, &mut optimizer);
        }
        let final_error = (net.predict(&state)[1] - 2.0).abs();

        assert!(final_error < initial_error);
        assert!(final_error < 0.1, "error after training: {}", final_error);
    }

    #[test]
    fn gradients_are_clipped_before_the_update() {
        let net = network(10);
        let state = [5000.0, 8000.0, 3000.0, 9000.0];
        let samples = [TrainingSample { state: &state, action: 0, target: 1.0e6 }];

        let (gradients, loss) = net.clipped_gradients(&samples);

        let values: Vec<f32> = gradients.iter().flat_map(|layer| layer.weights.iter().chain(layer.biases.iter()).copied()).collect();
        assert!(loss > 1.0e5);
        assert!(values.iter().all(|g| g.abs() <= GRADIENT_CLIP_VALUE));
        assert!(values.iter().any(|g| g.abs() == GRADIENT_CLIP_VALUE), "no component reached the clip value");
    }

    #[test]
    fn first_update_moves_parameters_by_at_most_learning_rate() {
        let mut net = network(11);
        let before = net.clone();
        let mut optimizer = AdamOptimizer::new(1e-3, net.layers());
        let state = [5000.0, 8000.0, 3000.0, 9000.0];
        let samples = [TrainingSample { state: &state, action: 2, target: -1.0e6 }];

        net.fit_batch(&samples, &mut optimizer);

        for (updated, original) in net.layers().iter().zip(before.layers()) {
            for (a, b) in updated.weights.iter().zip(&original.weights).chain(updated.biases.iter().zip(&original.biases)) {
                assert!((a - b).abs() <= 1e-3 + 1e-6);
            }
        }
    }

    #[test]
    fn malformed_parameter_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("relay_qnet_corrupt_{}.json", std::process::id()));
        std::fs::write(&path, r#"{"layers":[{"input_size":2,"output_size":2,"weights":[0.1],"biases":[0.0,0.0]}]}"#).unwrap();
        let mut rng = StdRng::seed_from_u64(12);
        let mut net = QNetwork::new(2, 2, &[], Device::Cpu, &mut rng);
        let state = [0.5, 0.5];
        let before = net.predict(&state);

        let result = net.load_parameters(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(Error::CorruptParameters { layer: 0, .. })));
        assert_eq!(net.predict(&state), before);
    }

    #[test]
    fn broken_layer_chain_is_rejected() {
        let mut source = network(13);
        source.layers[1].input_size = 4;
        source.layers[1].weights.truncate(4 * 8);
        let mut target = network(14);

        let result = target.copy_parameters_from(&source);

        assert!(matches!(result, Err(Error::CorruptParameters { layer: 1, .. })));
    }

    #[test]
    fn smooth_l1_is_quadratic_near_zero_and_linear_outside() {
        assert!((smooth_l1(0.5) - 0.125).abs() < 1e-6);
        assert!((smooth_l1(-3.0) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, -1.0]), 1);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn parameters_survive_save_and_load() {
        let path = std::env::temp_dir().join(format!("relay_qnet_{}.json", std::process::id()));
        let source = network(8);
        let mut restored = network(9);

        source.save_parameters(&path).unwrap();
        restored.load_parameters(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let state = [0.1, 0.9, 0.4, 0.7];
        for (a, b) in source.predict(&state).iter().zip(restored.predict(&state)) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
