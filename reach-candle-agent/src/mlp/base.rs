use super::{mlp_forward, MlpConfig};
use crate::model::{SubModel1, SubModel2};
use anyhow::{ensure, Result};
use candle_core::{Device, Tensor, D};
use candle_nn::{linear, Init, Linear, VarBuilder};

/// Returns vector of linear modules from [`MlpConfig`].
fn create_linear_layers(prefix: &str, vs: VarBuilder, config: &MlpConfig) -> Result<Vec<Linear>> {
    ensure!(!config.units.is_empty(), "MLP needs at least one hidden layer");
    let mut in_out_pairs: Vec<(i64, i64)> = (0..config.units.len() - 1)
        .map(|i| (config.units[i], config.units[i + 1]))
        .collect();
    in_out_pairs.insert(0, (config.in_dim, config.units[0]));
    in_out_pairs.push((config.units[config.units.len() - 1], config.out_dim));
    let n_layers = in_out_pairs.len();
    let vs = vs.pp(prefix);

    in_out_pairs
        .iter()
        .enumerate()
        .map(|(i, &(in_dim, out_dim))| {
            let vs = vs.pp(format!("ln{}", i));
            match config.init_out {
                Some(v) if i == n_layers - 1 => {
                    let init = Init::Uniform { lo: -v, up: v };
                    let shape = (out_dim as usize, in_dim as usize);
                    let ws = vs.get_with_hints(shape, "weight", init)?;
                    let bs = vs.get_with_hints(out_dim as usize, "bias", init)?;
                    Ok(Linear::new(ws, Some(bs)))
                }
                _ => Ok(linear(in_dim as _, out_dim as _, vs)?),
            }
        })
        .collect()
}

/// Multilayer perceptron with ReLU activation function.
///
/// As a [`SubModel2`], the two inputs are concatenated along the last axis,
/// which is how critics take a state and an action.
pub struct Mlp {
    config: MlpConfig,
    device: Device,
    layers: Vec<Linear>,
}

fn _build(vs: VarBuilder, config: MlpConfig) -> Result<Mlp> {
    let device = vs.device().clone();
    let layers = create_linear_layers("mlp", vs, &config)?;

    Ok(Mlp {
        config,
        device,
        layers,
    })
}

impl SubModel1 for Mlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> Result<Tensor> {
        let xs = xs.to_device(&self.device)?;
        mlp_forward(xs, &self.layers, &self.config.activation_out)
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Result<Self> {
        _build(vs, config)
    }
}

impl SubModel2 for Mlp {
    type Config = MlpConfig;
    type Input1 = Tensor;
    type Input2 = Tensor;
    type Output = Tensor;

    fn forward(&self, input1: &Self::Input1, input2: &Self::Input2) -> Result<Tensor> {
        let input1 = input1.to_device(&self.device)?;
        let input2 = input2.to_device(&self.device)?;
        let input = Tensor::cat(&[input1, input2], D::Minus1)?;
        mlp_forward(input, &self.layers, &self.config.activation_out)
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Result<Self> {
        _build(vs, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mlp::Activation;
    use candle_core::DType;
    use candle_nn::VarMap;

    #[test]
    fn test_mlp_shapes_and_init() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let config = MlpConfig::new(3, vec![8, 8], 2, Activation::Tanh).init_out(3e-3);
        let mlp = <Mlp as SubModel2>::build(vb, config)?;

        let s = Tensor::ones((5, 2), DType::F32, &device)?;
        let a = Tensor::ones((5, 1), DType::F32, &device)?;
        let out = SubModel2::forward(&mlp, &s, &a)?;
        assert_eq!(out.dims(), [5, 2]);

        // Small output layer keeps outputs near zero
        let max = out.abs()?.flatten_all()?.max(0)?.to_scalar::<f32>()?;
        assert!(max < 0.1);

        let n_vars = varmap.all_vars().len();
        assert_eq!(n_vars, 6);
        Ok(())
    }
}
