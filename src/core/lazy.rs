//! Deferred planes and lazy time stacks
//!
//! A [`Deferred`] is a producer closure plus the geometry it promises to
//! return. A [`LazyStack`] is an ordered list of deferred planes sharing one
//! geometry, so its `(T, H, W)` shape is known without decoding anything.
//! Evaluation goes through an injected [`Executor`].

use crate::types::{DType, Plane, SzError, SzResult, Volume};
use ndarray::{Array2, Array3, ArrayView2, Axis};
use std::fmt;
use std::sync::Arc;

type Producer = dyn Fn() -> SzResult<Plane> + Send + Sync;

/// A promise of one `(H, W)` plane of a known dtype
#[derive(Clone)]
pub struct Deferred {
    label: String,
    shape: (usize, usize),
    dtype: DType,
    producer: Arc<Producer>,
}

impl Deferred {
    pub fn new<F>(label: impl Into<String>, shape: (usize, usize), dtype: DType, producer: F) -> Self
    where
        F: Fn() -> SzResult<Plane> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            shape,
            dtype,
            producer: Arc::new(producer),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Run the producer and check the result against the declared geometry
    pub fn compute(&self) -> SzResult<Plane> {
        log::debug!("Evaluating deferred plane {}", self.label);
        let plane = (self.producer)()?;

        if plane.shape() != self.shape || plane.dtype() != self.dtype {
            return Err(SzError::ShapeMismatch {
                label: self.label.clone(),
                expected_shape: self.shape,
                actual_shape: plane.shape(),
                expected_dtype: self.dtype,
                actual_dtype: plane.dtype(),
            });
        }

        Ok(plane)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("label", &self.label)
            .field("shape", &self.shape)
            .field("dtype", &self.dtype)
            .finish_non_exhaustive()
    }
}

/// Evaluation policy for a batch of independent tasks.
///
/// Results come back in task order.
pub trait Executor {
    fn run<F, R>(&self, tasks: Vec<F>) -> Vec<R>
    where
        F: FnOnce() -> R + Send,
        R: Send;
}

/// Evaluates tasks one after another on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl Executor for Sequential {
    fn run<F, R>(&self, tasks: Vec<F>) -> Vec<R>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        tasks.into_iter().map(|task| task()).collect()
    }
}

/// Evaluates tasks on a rayon thread pool
#[cfg(feature = "parallel")]
#[derive(Debug, Default)]
pub struct RayonExecutor {
    pool: Option<rayon::ThreadPool>,
}

#[cfg(feature = "parallel")]
impl RayonExecutor {
    /// Use rayon's global pool
    pub fn new() -> Self {
        Self { pool: None }
    }

    /// Use a dedicated pool with `num_threads` workers
    pub fn with_threads(num_threads: usize) -> SzResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| SzError::Processing(format!("Failed to build thread pool: {}", e)))?;
        Ok(Self { pool: Some(pool) })
    }
}

#[cfg(feature = "parallel")]
impl Executor for RayonExecutor {
    fn run<F, R>(&self, tasks: Vec<F>) -> Vec<R>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        use rayon::prelude::*;

        let run_all = || tasks.into_par_iter().map(|task| task()).collect::<Vec<R>>();
        match &self.pool {
            Some(pool) => pool.install(run_all),
            None => run_all(),
        }
    }
}

/// A lazily evaluated `(T, H, W)` stack of deferred planes
#[derive(Debug, Clone)]
pub struct LazyStack {
    name: String,
    plane_shape: (usize, usize),
    dtype: DType,
    frames: Vec<Deferred>,
}

impl LazyStack {
    /// Stack `frames` along a new leading time axis.
    ///
    /// Every frame must declare `plane_shape` and `dtype`; nothing is evaluated.
    pub fn stack(
        name: impl Into<String>,
        plane_shape: (usize, usize),
        dtype: DType,
        frames: Vec<Deferred>,
    ) -> SzResult<Self> {
        if let Some(bad) = frames
            .iter()
            .find(|f| f.shape() != plane_shape || f.dtype() != dtype)
        {
            return Err(SzError::ShapeMismatch {
                label: bad.label().to_string(),
                expected_shape: plane_shape,
                actual_shape: bad.shape(),
                expected_dtype: dtype,
                actual_dtype: bad.dtype(),
            });
        }

        Ok(Self {
            name: name.into(),
            plane_shape,
            dtype,
            frames,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.frames.len(), self.plane_shape.0, self.plane_shape.1]
    }

    pub fn plane_shape(&self) -> (usize, usize) {
        self.plane_shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Deferred] {
        &self.frames
    }

    /// Evaluate the plane at time index `t`
    pub fn compute_frame(&self, t: usize) -> SzResult<Plane> {
        let frame = self.frames.get(t).ok_or_else(|| {
            SzError::Processing(format!(
                "time index {} out of range for {} ({} frames)",
                t,
                self.name,
                self.frames.len()
            ))
        })?;
        frame.compute()
    }

    /// Evaluate every frame through `executor` and stack the results
    pub fn compute<E: Executor>(&self, executor: &E) -> SzResult<Volume> {
        log::info!("Computing stack {} with shape {:?}", self.name, self.shape());

        let tasks: Vec<_> = self
            .frames
            .iter()
            .map(|frame| move || frame.compute())
            .collect();
        let planes = executor.run(tasks).into_iter().collect::<SzResult<Vec<_>>>()?;

        match self.dtype {
            DType::U8 => Ok(Volume::U8(stack_planes(self.plane_shape, planes, |p| match p {
                Plane::U8(a) => Some(a),
                _ => None,
            })?)),
            DType::U16 => Ok(Volume::U16(stack_planes(self.plane_shape, planes, |p| match p {
                Plane::U16(a) => Some(a),
                _ => None,
            })?)),
            DType::I16 => Ok(Volume::I16(stack_planes(self.plane_shape, planes, |p| match p {
                Plane::I16(a) => Some(a),
                _ => None,
            })?)),
            DType::F32 => Ok(Volume::F32(stack_planes(self.plane_shape, planes, |p| match p {
                Plane::F32(a) => Some(a),
                _ => None,
            })?)),
        }
    }
}

fn stack_planes<T, F>(shape: (usize, usize), planes: Vec<Plane>, unwrap: F) -> SzResult<Array3<T>>
where
    T: Clone,
    F: Fn(Plane) -> Option<Array2<T>>,
{
    let (rows, cols) = shape;
    if planes.is_empty() {
        return Ok(Array3::from_shape_vec((0, rows, cols), Vec::new())
            .map_err(|e| SzError::Processing(format!("Failed to allocate empty stack: {}", e)))?);
    }

    let arrays = planes
        .into_iter()
        .map(|p| {
            let dtype = p.dtype();
            unwrap(p).ok_or_else(|| SzError::Processing(format!("unexpected {} plane in stack", dtype)))
        })
        .collect::<SzResult<Vec<_>>>()?;
    let views: Vec<ArrayView2<'_, T>> = arrays.iter().map(|a| a.view()).collect();

    ndarray::stack(Axis(0), &views)
        .map_err(|e| SzError::Processing(format!("Failed to stack planes: {}", e)))
}
