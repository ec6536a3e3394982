use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    assets::{PreparedImage, decode},
    config::{EntityRegistry, IconSize},
    foundation::error::{RaceError, RaceResult},
};

/// Per-entity icons decoded and resized up front, so rendering does no IO.
#[derive(Clone, Debug, Default)]
pub struct IconStore {
    by_entity: HashMap<String, PreparedImage>,
}

impl IconStore {
    /// Load the icon of every entity in `entities` from the registry.
    ///
    /// Relative icon paths resolve against `root`. An entity missing from the registry is a
    /// registry error.
    pub fn prepare<'a>(
        registry: &EntityRegistry,
        entities: impl IntoIterator<Item = &'a str>,
        root: &Path,
        size: IconSize,
    ) -> RaceResult<Self> {
        let mut out = Self::default();

        for name in entities {
            if out.by_entity.contains_key(name) {
                continue;
            }
            let style = registry.require(name)?;
            let path = resolve(root, &style.icon);
            let icon = load_icon(&path, size)
                .with_context(|| format!("load icon for '{name}'"))?;
            tracing::debug!(entity = name, path = %path.display(), "prepared icon");
            out.by_entity.insert(name.to_string(), icon);
        }

        tracing::info!(icons = out.by_entity.len(), "prepared icons");
        Ok(out)
    }

    pub fn get(&self, entity: &str) -> RaceResult<&PreparedImage> {
        self.by_entity
            .get(entity)
            .ok_or_else(|| RaceError::registry(format!("no icon prepared for entity '{entity}'")))
    }

    pub fn len(&self) -> usize {
        self.by_entity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_entity.is_empty()
    }
}

fn resolve(root: &Path, icon: &Path) -> PathBuf {
    if icon.is_absolute() {
        icon.to_path_buf()
    } else {
        root.join(icon)
    }
}

fn load_icon(path: &Path, size: IconSize) -> RaceResult<PreparedImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read icon '{}'", path.display()))?;
    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));

    if is_svg {
        decode::rasterize_svg_to_size(&bytes, size.width, size.height)
    } else {
        decode::decode_image_to_size(&bytes, size.width, size.height)
    }
}
