//! Video surface and bundled asset abstractions.

use crate::{error::Result, media::TextureId, platform::PlatformSendSync};

/// Surface texture registered with the host compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureEntry {
    pub id: TextureId,
}

/// Host texture registry.
///
/// Returns [`BridgeError::NotAvailable`](crate::BridgeError::NotAvailable)
/// when there is no foreground activity to attach a surface to.
pub trait TextureRegistry: PlatformSendSync {
    fn create_surface_texture(&self) -> Result<TextureEntry>;

    fn release_texture(&self, id: TextureId);
}

/// Resolves bundled asset names to the host's lookup keys.
pub trait AssetResolver: PlatformSendSync {
    fn lookup_key_for_asset(&self, asset: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BridgeError;
    use mockall::mock;

    mock! {
        Registry {}

        impl TextureRegistry for Registry {
            fn create_surface_texture(&self) -> Result<TextureEntry>;
            fn release_texture(&self, id: TextureId);
        }
    }

    #[test]
    fn registry_reports_missing_activity() {
        let mut registry = MockRegistry::new();
        registry
            .expect_create_surface_texture()
            .times(1)
            .returning(|| Err(BridgeError::NotAvailable("no foreground activity".into())));

        let result = registry.create_surface_texture();
        assert!(matches!(result, Err(BridgeError::NotAvailable(_))));
    }

    #[test]
    fn registry_hands_out_textures() {
        let mut registry = MockRegistry::new();
        registry
            .expect_create_surface_texture()
            .returning(|| Ok(TextureEntry { id: TextureId(7) }));
        registry
            .expect_release_texture()
            .withf(|id| *id == TextureId(7))
            .times(1)
            .return_const(());

        let entry = registry.create_surface_texture().unwrap();
        registry.release_texture(entry.id);
    }
}
