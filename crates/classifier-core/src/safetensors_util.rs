use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use log::{debug, warn};
use memmap2::MmapOptions;
use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensors};
use tch::{nn, Device, Kind, Tensor};

use crate::error::{ModelError, Result};

/// Outcome of copying a safetensors file into a `VarStore`.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    /// Tensors in the file with no matching variable (e.g. pre-training heads).
    pub unexpected: Vec<String>,
    /// Variables the file did not provide; they keep their random init.
    pub missing: Vec<String>,
}

/// Names a stored tensor may map to: as-is, under the `bert.` prefix, and with
/// legacy `gamma`/`beta` LayerNorm names.
fn candidate_names(name: &str) -> Vec<String> {
    let renamed = if let Some(stem) = name.strip_suffix(".gamma") {
        format!("{stem}.weight")
    } else if let Some(stem) = name.strip_suffix(".beta") {
        format!("{stem}.bias")
    } else {
        name.to_string()
    };

    let mut names = vec![renamed.clone()];
    if !renamed.starts_with("bert.") {
        names.push(format!("bert.{renamed}"));
    }
    names
}

fn to_kind(name: &str, dtype: Dtype) -> Result<Kind> {
    match dtype {
        Dtype::F32 => Ok(Kind::Float),
        Dtype::F16 => Ok(Kind::Half),
        Dtype::BF16 => Ok(Kind::BFloat16),
        Dtype::F64 => Ok(Kind::Double),
        other => Err(ModelError::UnsupportedDtype {
            name: name.to_string(),
            dtype: format!("{other:?}"),
        }),
    }
}

pub fn load_safetensors<P: AsRef<Path>>(vs: &mut nn::VarStore, path: P) -> Result<LoadReport> {
    let file = File::open(path)?;
    let buffer = unsafe { MmapOptions::new().map(&file)? };
    let tensors = SafeTensors::deserialize(&buffer)?;

    let mut variables = vs.variables();
    let device = vs.device();
    let mut report = LoadReport::default();

    for (name, view) in tensors.tensors() {
        let target = candidate_names(&name)
            .into_iter()
            .find(|candidate| variables.contains_key(candidate));

        let Some(target) = target else {
            report.unexpected.push(name);
            continue;
        };
        let Some(var) = variables.get_mut(&target) else {
            continue;
        };

        let shape: Vec<i64> = view.shape().iter().map(|&x| x as i64).collect();
        if var.size() != shape {
            return Err(ModelError::ShapeMismatch {
                name: target,
                expected: var.size(),
                found: shape,
            });
        }

        let kind = to_kind(&name, view.dtype())?;
        let tensor = Tensor::from_data_size(view.data(), &shape, kind).to_device(device);

        tch::no_grad(|| {
            var.copy_(&tensor);
        });
        debug!("Loaded tensor: {} -> {}", name, target);
        report.loaded.push(target);
    }

    let mut missing: Vec<String> = variables
        .keys()
        .filter(|name| !report.loaded.contains(*name))
        .cloned()
        .collect();
    missing.sort();
    report.missing = missing;

    if !report.unexpected.is_empty() {
        warn!(
            "{} tensors in the weights file have no matching variable",
            report.unexpected.len()
        );
    }

    Ok(report)
}

/// Writes every variable as F32 together with string `metadata`.
pub fn save_safetensors<P: AsRef<Path>>(
    vs: &nn::VarStore,
    path: P,
    metadata: HashMap<String, String>,
) -> Result<()> {
    let mut entries: Vec<(String, Vec<usize>, Vec<u8>)> = Vec::new();

    for (name, tensor) in vs.variables() {
        let tensor = tensor
            .detach()
            .to_device(Device::Cpu)
            .to_kind(Kind::Float)
            .contiguous();
        let shape: Vec<usize> = tensor.size().iter().map(|&d| d as usize).collect();
        let values = Vec::<f32>::try_from(&tensor.flatten(0, -1))?;
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        entries.push((name, shape, bytes));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut views = Vec::with_capacity(entries.len());
    for (name, shape, bytes) in &entries {
        views.push((name.as_str(), TensorView::new(Dtype::F32, shape.clone(), bytes)?));
    }

    safetensors::serialize_to_file(views, &Some(metadata), path.as_ref())?;
    Ok(())
}

/// Reads only the header metadata of a safetensors file.
pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>> {
    let file = File::open(path)?;
    let buffer = unsafe { MmapOptions::new().map(&file)? };
    let (_, metadata) = SafeTensors::read_metadata(&buffer)?;
    Ok(metadata.metadata().clone().unwrap_or_default())
}
