use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EngineError;

/// Precomputed opacity bitmap of a texture. Row 0 is the bottom edge, matching world space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlphaMask {
    width: u32,
    height: u32,
    bits: Vec<u64>,
}

impl AlphaMask {
    pub fn empty(width: u32, height: u32) -> Self {
        let words = (width as usize * height as usize + 63) / 64;
        Self {
            width,
            height,
            bits: vec![0; words],
        }
    }

    pub fn opaque(width: u32, height: u32) -> Self {
        let mut mask = Self::empty(width, height);
        for y in 0..height {
            for x in 0..width {
                mask.set(x, y, true);
            }
        }
        mask
    }

    /// Builds a mask from one alpha byte per pixel, rows stored top-first like image data.
    pub fn from_alpha(width: u32, height: u32, alpha: &[u8]) -> Self {
        let mut mask = Self::empty(width, height);
        for (index, value) in alpha.iter().enumerate().take(width as usize * height as usize) {
            if *value > 0 {
                let x = (index % width as usize) as u32;
                let row = (index / width as usize) as u32;
                mask.set(x, height - 1 - row, true);
            }
        }
        mask
    }

    /// Mask from a predicate over local coordinates (bottom-left origin).
    pub fn from_fn(width: u32, height: u32, opaque: impl Fn(u32, u32) -> bool) -> Self {
        let mut mask = Self::empty(width, height);
        for y in 0..height {
            for x in 0..width {
                if opaque(x, y) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set(&mut self, x: u32, y: u32, opaque: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y as usize * self.width as usize + x as usize;
        let bit = 1u64 << (index % 64);
        if opaque {
            self.bits[index / 64] |= bit;
        } else {
            self.bits[index / 64] &= !bit;
        }
    }

    /// Pixels outside the mask are transparent.
    pub fn is_opaque(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return false;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.bits[index / 64] & (1u64 << (index % 64)) != 0
    }

    pub fn opaque_count(&self) -> usize {
        self.bits.iter().map(|word| word.count_ones() as usize).sum()
    }
}

#[derive(Debug)]
pub struct Texture {
    path: String,
    mask: AlphaMask,
}

impl Texture {
    pub fn new(path: impl Into<String>, mask: AlphaMask) -> Self {
        Self {
            path: path.into(),
            mask,
        }
    }

    pub fn solid(path: impl Into<String>, width: u32, height: u32) -> Self {
        Self::new(path, AlphaMask::opaque(width, height))
    }

    /// Decoded RGBA8 pixels, rows top-first. Only the alpha channel is kept.
    pub fn from_rgba(path: impl Into<String>, width: u32, height: u32, rgba: &[u8]) -> Result<Self, EngineError> {
        let path = path.into();
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(EngineError::InvalidPixelData {
                path,
                expected,
                actual: rgba.len(),
            });
        }
        let alpha: Vec<u8> = rgba.chunks_exact(4).map(|pixel| pixel[3]).collect();
        Ok(Self::new(path, AlphaMask::from_alpha(width, height, &alpha)))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    pub fn mask(&self) -> &AlphaMask {
        &self.mask
    }

    pub fn is_opaque(&self, x: i32, y: i32) -> bool {
        self.mask.is_opaque(x, y)
    }
}

/// Resolves a logical asset path to a decoded texture.
pub trait AssetProvider: Send + Sync {
    fn texture(&self, path: &str) -> Option<Arc<Texture>>;
}

/// In-memory texture cache keyed by path.
#[derive(Default)]
pub struct AssetLibrary {
    textures: HashMap<String, Arc<Texture>>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, texture: Texture) -> Arc<Texture> {
        let texture = Arc::new(texture);
        self.textures.insert(texture.path().to_string(), texture.clone());
        texture
    }

    pub fn get(&self, path: &str) -> Option<Arc<Texture>> {
        self.textures.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.textures.keys().map(|p| p.as_str()).collect();
        paths.sort_unstable();
        paths
    }
}

impl AssetProvider for AssetLibrary {
    fn texture(&self, path: &str) -> Option<Arc<Texture>> {
        self.get(path)
    }
}
