//! Message definitions as data
//!
//! Every message type is a static table of field descriptors read by one generic
//! builder and one generic validator. Adding a field or a message type means adding
//! a row here, not a code path.

use serde_json::Value;

use super::{
    Direction, DEFAULT_VARIANT_NAME, DEFAULT_VERSION_LABEL, MSG_IMPORT_ASSET,
    MSG_REGENERATE_THUMBNAIL, MSG_REVIEW_SCREENSHOT,
};

/// Value used when a field is empty after the source and its fallbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Str(&'static str),
    Bool(bool),
}

impl FieldDefault {
    pub fn to_value(self) -> Value {
        match self {
            FieldDefault::Str(s) => Value::String(s.to_string()),
            FieldDefault::Bool(b) => Value::Bool(b),
        }
    }
}

/// One field of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Key in the written message
    pub name: &'static str,
    /// Metadata key read when building
    pub source: &'static str,
    /// Metadata keys tried in order when `source` is empty
    pub fallbacks: &'static [&'static str],
    pub required: bool,
    pub default: Option<FieldDefault>,
}

impl FieldDef {
    const fn new(name: &'static str, source: &'static str) -> Self {
        FieldDef {
            name,
            source,
            fallbacks: &[],
            required: false,
            default: None,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn fallbacks(mut self, fallbacks: &'static [&'static str]) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    const fn default_str(mut self, value: &'static str) -> Self {
        self.default = Some(FieldDefault::Str(value));
        self
    }

    const fn default_bool(mut self, value: bool) -> Self {
        self.default = Some(FieldDefault::Bool(value));
        self
    }
}

/// One message type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageDef {
    pub message_type: &'static str,
    /// File name prefix, files are `{prefix}_{timestamp}.json`
    pub file_prefix: &'static str,
    pub direction: Direction,
    pub description: &'static str,
    pub fields: &'static [FieldDef],
}

impl MessageDef {
    /// Glob-style pattern of this type's queue files
    pub fn file_pattern(&self) -> String {
        format!("{}_*.json", self.file_prefix)
    }

    /// Whether a queue file name belongs to this type
    pub fn matches_file(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.file_prefix)
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|rest| rest.ends_with(".json"))
    }
}

/// A semantic identifier role and the concrete keys that carry it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierDef {
    pub role: &'static str,
    pub name: &'static str,
    pub fallbacks: &'static [&'static str],
    pub description: &'static str,
}

pub static IDENTIFIER_FIELDS: &[IdentifierDef] = &[
    IdentifierDef {
        role: "session_identifier",
        name: "asset_uuid",
        fallbacks: &["version_group_id", "asset_id", "uuid"],
        description: "review session key, shared by every version of an asset",
    },
    IdentifierDef {
        role: "storage_identifier",
        name: "asset_id",
        fallbacks: &["version_group_id", "asset_uuid", "uuid"],
        description: "family id used for storage paths",
    },
    IdentifierDef {
        role: "version_identifier",
        name: "uuid",
        fallbacks: &[],
        description: "id of one version record",
    },
    IdentifierDef {
        role: "version_chain",
        name: "version_group_id",
        fallbacks: &["asset_id", "uuid"],
        description: "id linking all versions of one asset",
    },
];

static IMPORT_ASSET_FIELDS: &[FieldDef] = &[
    FieldDef::new("asset_uuid", "uuid").required(),
    FieldDef::new("version_group_id", "version_group_id")
        .required()
        .fallbacks(&["asset_id", "uuid"]),
    FieldDef::new("asset_id", "asset_id")
        .required()
        .fallbacks(&["version_group_id", "uuid"]),
    FieldDef::new("version", "version").required(),
    FieldDef::new("version_label", "version_label")
        .required()
        .default_str(DEFAULT_VERSION_LABEL),
    FieldDef::new("asset_name", "name")
        .required()
        .fallbacks(&["asset_name"]),
    FieldDef::new("asset_type", "asset_type").required(),
    FieldDef::new("variant_name", "variant_name").default_str(DEFAULT_VARIANT_NAME),
    FieldDef::new("usd_file_path", "usd_file_path"),
    FieldDef::new("blend_file_path", "blend_file_path"),
    FieldDef::new("import_method", "import_method").default_str("BLEND"),
    FieldDef::new("link_mode", "link_mode").default_str("APPEND"),
    FieldDef::new("keep_location", "keep_location").default_bool(true),
    FieldDef::new("representation_type", "representation_type").default_str("none"),
];

static REVIEW_SCREENSHOT_FIELDS: &[FieldDef] = &[
    FieldDef::new("asset_uuid", "version_group_id")
        .required()
        .fallbacks(&["asset_id", "uuid", "asset_uuid"]),
    FieldDef::new("asset_id", "asset_id").fallbacks(&["version_group_id", "asset_uuid", "uuid"]),
    FieldDef::new("variant_name", "variant_name").default_str(DEFAULT_VARIANT_NAME),
    FieldDef::new("version_label", "version_label")
        .required()
        .default_str(DEFAULT_VERSION_LABEL),
    FieldDef::new("asset_name", "asset_name")
        .fallbacks(&["name"])
        .default_str("Asset"),
    FieldDef::new("display_name", "display_name").default_str("Screenshot"),
    FieldDef::new("screenshot_path", "screenshot_path").required(),
    FieldDef::new("source", "source").default_str("blender"),
    FieldDef::new("blender_version", "blender_version"),
];

static REGENERATE_THUMBNAIL_FIELDS: &[FieldDef] = &[
    FieldDef::new("asset_uuid", "uuid").required(),
    FieldDef::new("version_group_id", "version_group_id").fallbacks(&["asset_id", "uuid"]),
    FieldDef::new("asset_id", "asset_id").fallbacks(&["version_group_id", "uuid"]),
    FieldDef::new("asset_name", "name")
        .required()
        .fallbacks(&["asset_name"]),
    FieldDef::new("usd_file_path", "usd_file_path").required(),
    FieldDef::new("thumbnail_path", "thumbnail_path").required(),
];

pub static MESSAGE_TYPES: &[MessageDef] = &[
    MessageDef {
        message_type: MSG_IMPORT_ASSET,
        file_prefix: "import",
        direction: Direction::DesktopToBlender,
        description: "import an asset into the modeling scene",
        fields: IMPORT_ASSET_FIELDS,
    },
    MessageDef {
        message_type: MSG_REVIEW_SCREENSHOT,
        file_prefix: "screenshot",
        direction: Direction::BlenderToDesktop,
        description: "screenshot captured for asset review",
        fields: REVIEW_SCREENSHOT_FIELDS,
    },
    MessageDef {
        message_type: MSG_REGENERATE_THUMBNAIL,
        file_prefix: "thumbnail",
        direction: Direction::DesktopToBlender,
        description: "render a fresh asset thumbnail",
        fields: REGENERATE_THUMBNAIL_FIELDS,
    },
];

/// Definition of a message type
pub fn message_def(message_type: &str) -> Option<&'static MessageDef> {
    MESSAGE_TYPES.iter().find(|d| d.message_type == message_type)
}

/// Definition of an identifier role
pub fn identifier_def(role: &str) -> Option<&'static IdentifierDef> {
    IDENTIFIER_FIELDS.iter().find(|d| d.role == role)
}
