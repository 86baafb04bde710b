//! Registry of available decode transforms.
//!
//! The hosting application builds one registry at startup and hands it to
//! the container session. Lookups match on the major type and subtype of the
//! stream; a registration without a subtype matches every subtype of its major
//! type and is used only when no exact registration exists.

use super::passthrough::PassthroughTransform;
use super::Transform;
use asfclip_common::{Error, MajorType, Result};
use asfclip_media::Subtype;

type Factory = Box<dyn Fn() -> Box<dyn Transform> + Send + Sync>;

struct Registration {
    name: String,
    major: MajorType,
    subtype: Option<Subtype>,
    factory: Factory,
}

/// Name and match criteria of a registered transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecInfo {
    pub name: String,
    pub major: MajorType,
    /// `None` for registrations matching any subtype.
    pub subtype: Option<Subtype>,
}

/// Decode transforms available to container sessions.
#[derive(Default)]
pub struct CodecRegistry {
    entries: Vec<Registration>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the passthrough transform for every audio and video
    /// subtype.
    pub fn with_passthrough() -> Self {
        let mut registry = Self::new();
        registry.register_passthrough();
        registry
    }

    /// Register a transform for one subtype.
    pub fn register<F>(&mut self, name: &str, major: MajorType, subtype: Subtype, factory: F)
    where
        F: Fn() -> Box<dyn Transform> + Send + Sync + 'static,
    {
        self.push(name, major, Some(subtype), Box::new(factory));
    }

    /// Register a transform for every subtype of a major type.
    pub fn register_any<F>(&mut self, name: &str, major: MajorType, factory: F)
    where
        F: Fn() -> Box<dyn Transform> + Send + Sync + 'static,
    {
        self.push(name, major, None, Box::new(factory));
    }

    /// Register the passthrough transform for audio and video.
    pub fn register_passthrough(&mut self) {
        for major in [MajorType::Audio, MajorType::Video] {
            self.register_any(PassthroughTransform::NAME, major, || {
                Box::new(PassthroughTransform::new())
            });
        }
    }

    fn push(&mut self, name: &str, major: MajorType, subtype: Option<Subtype>, factory: Factory) {
        tracing::debug!(name, %major, subtype = ?subtype, "Registered decode transform");
        self.entries.push(Registration {
            name: name.to_string(),
            major,
            subtype,
            factory,
        });
    }

    fn lookup(&self, major: MajorType, subtype: Subtype) -> Option<&Registration> {
        let mut candidates = self.entries.iter().filter(|e| e.major == major);
        let exact = candidates.clone().find(|e| e.subtype == Some(subtype));
        exact.or_else(|| candidates.find(|e| e.subtype.is_none()))
    }

    /// Find the transform that would decode a stream.
    pub fn find(&self, major: MajorType, subtype: Subtype) -> Option<CodecInfo> {
        self.lookup(major, subtype).map(|e| CodecInfo {
            name: e.name.clone(),
            major: e.major,
            subtype: e.subtype,
        })
    }

    /// Instantiate the transform for a stream.
    pub fn create(
        &self,
        major: MajorType,
        subtype: Subtype,
    ) -> Result<(String, Box<dyn Transform>)> {
        let entry = self.lookup(major, subtype).ok_or_else(|| Error::CodecNotFound {
            major,
            subtype: subtype.to_string(),
        })?;
        Ok((entry.name.clone(), (entry.factory)()))
    }

    pub fn codecs(&self) -> Vec<CodecInfo> {
        self.entries
            .iter()
            .map(|e| CodecInfo {
                name: e.name.clone(),
                major: e.major,
                subtype: e.subtype,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("codecs", &self.codecs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const WMA2: Subtype = Subtype::WaveFormat(0x0161);

    #[test]
    fn test_empty_registry_reports_codec_not_found() {
        let registry = CodecRegistry::new();
        assert!(registry.is_empty());
        let err = registry.create(MajorType::Audio, WMA2).err();
        assert_matches!(
            err,
            Some(Error::CodecNotFound {
                major: MajorType::Audio,
                ref subtype,
            }) if subtype == "0x0161"
        );
    }

    #[test]
    fn test_exact_match_preferred_over_wildcard() {
        let mut registry = CodecRegistry::with_passthrough();
        registry.register("wma2", MajorType::Audio, WMA2, || Box::new(PassthroughTransform::new()));

        assert_eq!(registry.find(MajorType::Audio, WMA2).unwrap().name, "wma2");
        assert_eq!(
            registry.find(MajorType::Audio, Subtype::WaveFormat(0x0162)).unwrap().name,
            PassthroughTransform::NAME
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_major_type_must_match() {
        let mut registry = CodecRegistry::new();
        registry.register_any("video-only", MajorType::Video, || {
            Box::new(PassthroughTransform::new())
        });
        assert!(registry.find(MajorType::Audio, WMA2).is_none());
        let (name, _transform) = registry
            .create(MajorType::Video, Subtype::FourCc(*b"WMV3"))
            .unwrap();
        assert_eq!(name, "video-only");
    }
}
