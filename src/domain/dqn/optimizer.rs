use crate::domain::dqn::q_network::DenseLayer;

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;

/// Adam with bias correction, one moment pair per parameter.
#[derive(Debug, Clone)]
pub struct AdamOptimizer {
    learning_rate: f64,
    step: i32,
    first_moment: Vec<DenseLayer>,
    second_moment: Vec<DenseLayer>,
}

impl AdamOptimizer {
    pub fn new(learning_rate: f64, layers: &[DenseLayer]) -> Self {
        AdamOptimizer {
            learning_rate,
            step: 0,
            first_moment: layers.iter().map(DenseLayer::zeros_like).collect(),
            second_moment: layers.iter().map(DenseLayer::zeros_like).collect(),
        }
    }

    pub fn steps_taken(&self) -> i32 {
        self.step
    }

    pub fn step(&mut self, layers: &mut [DenseLayer], gradients: &[DenseLayer]) {
        self.step += 1;
        let bias_correction1 = 1.0 - BETA1.powi(self.step);
        let bias_correction2 = 1.0 - BETA2.powi(self.step);
        let learning_rate = self.learning_rate;

        for (((layer, gradient), m), v) in layers.iter_mut().zip(gradients).zip(self.first_moment.iter_mut()).zip(self.second_moment.iter_mut()) {
            update(&mut layer.weights, &gradient.weights, &mut m.weights, &mut v.weights, learning_rate, bias_correction1, bias_correction2);
            update(&mut layer.biases, &gradient.biases, &mut m.biases, &mut v.biases, learning_rate, bias_correction1, bias_correction2);
        }
    }
}

fn update(params: &mut [f32], grads: &[f32], m: &mut [f32], v: &mut [f32], learning_rate: f64, bias_correction1: f64, bias_correction2: f64) {
    for i in 0..params.len() {
        let g = grads[i] as f64;
        let m_i = BETA1 * m[i] as f64 + (1.0 - BETA1) * g;
        let v_i = BETA2 * v[i] as f64 + (1.0 - BETA2) * g * g;
        m[i] = m_i as f32;
        v[i] = v_i as f32;

        let m_hat = m_i / bias_correction1;
        let v_hat = v_i / bias_correction2;
        params[i] -= (learning_rate * m_hat / (v_hat.sqrt() + EPSILON)) as f32;
    }
}
