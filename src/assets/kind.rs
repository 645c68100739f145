use serde::{Deserialize, Serialize};

/// Generation steps an asset kind requires beyond copy, which every kind gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Capabilities {
    pub needs_image: bool,
    pub needs_video: bool,
    pub needs_voiceover: bool,
    pub needs_text_overlay: bool,
}

impl Capabilities {
    const fn new(image: bool, video: bool, voiceover: bool, text_overlay: bool) -> Self {
        Self {
            needs_image: image,
            needs_video: video,
            needs_voiceover: voiceover,
            needs_text_overlay: text_overlay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    SocialPost,
    Story,
    DisplayAd,
    EmailHeader,
    VideoAd,
    ShortVideo,
    AudioAd,
    BlogPost,
    EmailCopy,
}

impl AssetKind {
    pub const ALL: [Self; 9] = [
        Self::SocialPost,
        Self::Story,
        Self::DisplayAd,
        Self::EmailHeader,
        Self::VideoAd,
        Self::ShortVideo,
        Self::AudioAd,
        Self::BlogPost,
        Self::EmailCopy,
    ];

    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::SocialPost => Capabilities::new(true, false, false, true),
            Self::Story => Capabilities::new(true, false, false, true),
            Self::DisplayAd => Capabilities::new(true, false, false, true),
            Self::EmailHeader => Capabilities::new(true, false, false, true),
            Self::VideoAd => Capabilities::new(true, true, true, true),
            Self::ShortVideo => Capabilities::new(true, true, false, false),
            Self::AudioAd => Capabilities::new(false, false, true, false),
            Self::BlogPost => Capabilities::new(false, false, false, false),
            Self::EmailCopy => Capabilities::new(false, false, false, false),
        }
    }

    /// Vertical full-screen kinds ignore the platform's feed size.
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Story | Self::ShortVideo)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SocialPost => "social_post",
            Self::Story => "story",
            Self::DisplayAd => "display_ad",
            Self::EmailHeader => "email_header",
            Self::VideoAd => "video_ad",
            Self::ShortVideo => "short_video",
            Self::AudioAd => "audio_ad",
            Self::BlogPost => "blog_post",
            Self::EmailCopy => "email_copy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Instagram,
    Facebook,
    Twitter,
    Linkedin,
    Tiktok,
    Youtube,
    Pinterest,
    Display,
    Email,
    Generic,
}

impl Platform {
    /// Native feed image size in pixels.
    pub fn image_size(self) -> (u32, u32) {
        match self {
            Self::Instagram => (1080, 1080),
            Self::Facebook => (1200, 630),
            Self::Twitter => (1600, 900),
            Self::Linkedin => (1200, 627),
            Self::Tiktok => (1080, 1920),
            Self::Youtube => (1280, 720),
            Self::Pinterest => (1000, 1500),
            Self::Display => (1200, 628),
            Self::Email => (1200, 600),
            Self::Generic => (1024, 1024),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::Twitter => "twitter",
            Self::Linkedin => "linkedin",
            Self::Tiktok => "tiktok",
            Self::Youtube => "youtube",
            Self::Pinterest => "pinterest",
            Self::Display => "display",
            Self::Email => "email",
            Self::Generic => "generic",
        }
    }
}

/// Target pixel size for a kind on a platform.
pub fn target_dimensions(kind: AssetKind, platform: Platform) -> (u32, u32) {
    if kind.is_vertical() {
        return (1080, 1920);
    }
    platform.image_size()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_table_matches_kind_intent() {
        let social = AssetKind::SocialPost.capabilities();
        assert!(social.needs_image && social.needs_text_overlay);
        assert!(!social.needs_video && !social.needs_voiceover);

        let video = AssetKind::VideoAd.capabilities();
        assert!(video.needs_image && video.needs_video && video.needs_voiceover);

        let blog = AssetKind::BlogPost.capabilities();
        assert_eq!(
            blog,
            Capabilities {
                needs_image: false,
                needs_video: false,
                needs_voiceover: false,
                needs_text_overlay: false,
            }
        );
    }

    #[test]
    fn overlay_never_requested_without_image() {
        for kind in AssetKind::ALL {
            let caps = kind.capabilities();
            if caps.needs_text_overlay || caps.needs_video {
                assert!(caps.needs_image, "{} needs an image", kind.as_str());
            }
        }
    }

    #[test]
    fn vertical_kinds_override_platform_size() {
        assert_eq!(
            target_dimensions(AssetKind::Story, Platform::Instagram),
            (1080, 1920)
        );
        assert_eq!(
            target_dimensions(AssetKind::SocialPost, Platform::Instagram),
            (1080, 1080)
        );
    }

    #[test]
    fn kinds_deserialize_from_snake_case() {
        let kind: AssetKind = serde_json::from_str("\"social_post\"").expect("kind should parse");
        assert_eq!(kind, AssetKind::SocialPost);
        assert!(serde_json::from_str::<AssetKind>("\"hologram\"").is_err());
    }
}
