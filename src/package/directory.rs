use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use quick_xml::{events::Event, Reader};
use walkdir::WalkDir;

use crate::{
    package::{Package, PackageIdentity},
    Error, Result,
};

/// An extracted package: a folder with the package's files.
///
/// The identity comes from the `.nuspec` manifest at the root of the folder. Without one, or
/// if it lacks an `<id>`, the folder name is split into id and version instead.
#[derive(Debug)]
pub struct DirectoryPackage {
    root: PathBuf,
    identity: PackageIdentity,
    files: Vec<String>,
}

impl DirectoryPackage {
    /// Enumerates the files below `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder can't be walked or the manifest can't be read.
    pub fn open(root: &Path) -> Result<DirectoryPackage> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let parts: Vec<_> = relative
                .components()
                .map(|part| part.as_os_str().to_string_lossy())
                .collect();
            files.push(parts.join("/"));
        }
        files.sort();

        let manifest = files
            .iter()
            .find(|file| !file.contains('/') && file.ends_with(".nuspec"))
            .map(|file| fs::read_to_string(root.join(file)))
            .transpose()?;

        let identity = match manifest.as_deref().map(identity_from_nuspec).transpose()? {
            Some(Some(identity)) => identity,
            _ => {
                let name = root
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                debug!("No package id in the manifest of '{name}', using the folder name");
                PackageIdentity::from_folder_name(&name)
            }
        };

        Ok(DirectoryPackage {
            root: root.to_path_buf(),
            identity,
            files,
        })
    }

    /// The folder the package was read from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Package for DirectoryPackage {
    fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    fn files(&self) -> Result<Vec<String>> {
        Ok(self.files.clone())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        if self.files.binary_search_by(|file| file.as_str().cmp(path)).is_err() {
            return Err(Error::Error(format!(
                "'{path}' is not part of {}",
                self.identity
            )));
        }

        Ok(fs::read(self.root.join(path))?)
    }
}

/// Reads `<metadata><id>` and `<metadata><version>` of a `.nuspec` manifest.
///
/// `None` if the manifest has no id.
fn identity_from_nuspec(text: &str) -> Result<Option<PackageIdentity>> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut id = None;
    let mut version = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) => path.push(element.local_name().as_ref().to_vec()),
            Event::End(_) => {
                path.pop();
            }
            Event::Text(text) => {
                let in_metadata = path.len() == 3
                    && path[0] == b"package"
                    && path[1] == b"metadata";
                if !in_metadata {
                    continue;
                }

                match path[2].as_slice() {
                    b"id" => id = Some(text.unescape()?.into_owned()),
                    b"version" => version = Some(text.unescape()?.into_owned()),
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(id
        .filter(|id| !id.is_empty())
        .map(|id| PackageIdentity::new(id, version.unwrap_or_default())))
}
