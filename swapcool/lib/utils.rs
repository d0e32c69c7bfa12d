//! File output helpers.

use std::{
    fs,
    path::{ Path, PathBuf },
};
use ndarray as nd;
use ndarray_npy::{ NpzWriter, WritableElement };
use crate::error::OutputError;

pub type OutputResult<T> = Result<T, OutputError>;

/// Create a directory and all its parents, if they don't already exist.
pub fn mkdir<P>(path: P) -> OutputResult<()>
where P: AsRef<Path>
{
    let path = path.as_ref();
    fs::create_dir_all(path)
        .map_err(|source| {
            OutputError::Create { path: path.display().to_string(), source }
        })
}

/// An `.npz` archive open for writing.
pub struct NpzFile {
    path: PathBuf,
    writer: NpzWriter<fs::File>,
}

impl NpzFile {
    /// Create a new archive at `path`, truncating any existing file.
    pub fn create<P>(path: P) -> OutputResult<Self>
    where P: AsRef<Path>
    {
        let path = path.as_ref().to_path_buf();
        let file
            = fs::File::create(&path)
            .map_err(|source| {
                OutputError::Create { path: path.display().to_string(), source }
            })?;
        Ok(Self { path, writer: NpzWriter::new(file) })
    }

    /// Return the location of the archive.
    pub fn path(&self) -> &Path { &self.path }

    /// Add a named array.
    pub fn add<A, S, D>(&mut self, name: &str, array: &nd::ArrayBase<S, D>)
        -> OutputResult<()>
    where
        A: WritableElement,
        S: nd::Data<Elem = A>,
        D: nd::Dimension,
    {
        self.writer.add_array(name, array)
            .map_err(|source| {
                OutputError::Array { name: name.to_string(), source }
            })
    }

    /// Finalize the archive.
    pub fn finish(self) -> OutputResult<()> {
        self.writer.finish()?;
        Ok(())
    }
}

/// Create a directory and all its parents; see [`mkdir`].
#[macro_export]
macro_rules! mkdir {
    ( $path:expr ) => {
        $crate::utils::mkdir(&$path)
    }
}

/// Write a set of named arrays to a single `.npz` file, evaluating to
/// `OutputResult<()>`.
///
/// ```ignore
/// write_npz!(
///     outdir.join("data.npz"),
///     arrays: {
///         "time" => &time,
///         "rho" => &rho,
///     }
/// )?;
/// ```
#[macro_export]
macro_rules! write_npz {
    (
        $outfile:expr,
        arrays: { $( $name:literal => $array:expr ),* $(,)? } $(,)?
    ) => {
        $crate::utils::NpzFile::create($outfile)
            .and_then(|mut npz| {
                $( npz.add($name, $array)?; )*
                npz.finish()
            })
    }
}
