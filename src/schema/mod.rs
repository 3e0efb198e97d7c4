// Entity schema registry
//
// Every resource the API serves is described here as static data: field
// names, value types, requiredness and update rules. Handlers and the
// persistence mapper are generic over these descriptors, so adding a
// resource means adding a descriptor and a route, not a new CRUD stack.

use serde_json::Value;

pub mod validate;

pub use validate::{parse_id, validate_create, validate_update, FieldError};

/// Value type of a single entity field.
///
/// All field values arrive as JSON strings; the type controls how they are
/// checked at the boundary and how they are bound to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Free text, with optional length bounds in characters.
    Text { min: Option<u32>, max: Option<u32> },
    /// Text that must look like an email address.
    Email,
    /// UUID reference to another entity.
    Uuid,
    /// Calendar date in `YYYY-MM-DD` form.
    Date,
    /// One of a closed set of string values.
    Enum(&'static [&'static str]),
}

/// One client-writable field of an entity.
///
/// Server-managed columns (`id`, `created_at`, `updated_at`) are not listed
/// in descriptors; they are filled by the store and the database.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldType,
    /// Must be present and non-null on create.
    pub required: bool,
    /// Accepts an explicit JSON null.
    pub nullable: bool,
    /// Hashed before persistence and stripped from every response.
    pub secret: bool,
    /// Accepted by partial updates.
    pub updatable: bool,
}

impl FieldSpec {
    const fn required(name: &'static str, kind: FieldType) -> Self {
        Self { name, kind, required: true, nullable: false, secret: false, updatable: true }
    }

    const fn optional(name: &'static str, kind: FieldType) -> Self {
        Self { name, kind, required: false, nullable: false, secret: false, updatable: true }
    }

    const fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    const fn create_only(mut self) -> Self {
        self.updatable = false;
        self
    }

    const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Static description of one entity table.
#[derive(Debug)]
pub struct EntityDescriptor {
    pub fields: &'static [FieldSpec],
    /// Append-style tables (activity logs) carry no `updated_at` column.
    pub has_updated_at: bool,
}

impl EntityDescriptor {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }
}

pub const PROFILE_ROLES: &[&str] = &["admin", "user"];
pub const CONVERSATION_STATUSES: &[&str] = &["open", "closed", "archived"];
pub const MESSAGE_SENDER_ROLES: &[&str] = &["user", "assistant", "system"];
pub const DOCUMENT_STATUSES: &[&str] = &["pending", "processed", "failed"];
pub const ACTIVITY_ACTIONS: &[&str] = &["login", "create", "update", "delete"];

const TEXT: FieldType = FieldType::Text { min: None, max: None };
const NON_EMPTY_TEXT: FieldType = FieldType::Text { min: Some(1), max: None };

static PROFILE: EntityDescriptor = EntityDescriptor {
    fields: &[
        FieldSpec::required("nome", NON_EMPTY_TEXT),
        FieldSpec::required("email", FieldType::Email),
        // bcrypt ignores input past 72 bytes
        FieldSpec::required("profile_password", FieldType::Text { min: Some(6), max: Some(72) })
            .secret(),
        FieldSpec::required("cpf", FieldType::Text { min: Some(11), max: Some(14) }),
        FieldSpec::required("telefone", NON_EMPTY_TEXT),
        FieldSpec::required("data_nascimento", FieldType::Date),
        FieldSpec::optional("profile_role", FieldType::Enum(PROFILE_ROLES)),
    ],
    has_updated_at: true,
};

static CONVERSATION: EntityDescriptor = EntityDescriptor {
    fields: &[
        FieldSpec::required("profile_id", FieldType::Uuid).create_only(),
        FieldSpec::required("title", NON_EMPTY_TEXT),
        FieldSpec::optional("status", FieldType::Enum(CONVERSATION_STATUSES)),
    ],
    has_updated_at: true,
};

static MESSAGE: EntityDescriptor = EntityDescriptor {
    fields: &[
        FieldSpec::required("conversation_id", FieldType::Uuid).create_only(),
        FieldSpec::required("sender_role", FieldType::Enum(MESSAGE_SENDER_ROLES)),
        FieldSpec::required("content", NON_EMPTY_TEXT),
    ],
    has_updated_at: true,
};

static DOCUMENT: EntityDescriptor = EntityDescriptor {
    fields: &[
        FieldSpec::optional("profile_id", FieldType::Uuid).nullable(),
        FieldSpec::required("title", NON_EMPTY_TEXT),
        FieldSpec::required("content", NON_EMPTY_TEXT),
        FieldSpec::optional("status", FieldType::Enum(DOCUMENT_STATUSES)),
    ],
    has_updated_at: true,
};

static TAG: EntityDescriptor = EntityDescriptor {
    fields: &[FieldSpec::required("name", NON_EMPTY_TEXT)],
    has_updated_at: true,
};

static ACTIVITY_LOG: EntityDescriptor = EntityDescriptor {
    fields: &[
        FieldSpec::optional("profile_id", FieldType::Uuid).nullable(),
        FieldSpec::required("action", FieldType::Enum(ACTIVITY_ACTIONS)),
        FieldSpec::optional("description", TEXT).nullable(),
    ],
    has_updated_at: false,
};

/// The resources served by the API, one variant per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Profile,
    Conversation,
    Message,
    Document,
    Tag,
    ActivityLog,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Profile,
        EntityKind::Conversation,
        EntityKind::Message,
        EntityKind::Document,
        EntityKind::Tag,
        EntityKind::ActivityLog,
    ];

    /// Database table backing this entity.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Profile => "profiles",
            EntityKind::Conversation => "conversations",
            EntityKind::Message => "messages",
            EntityKind::Document => "documents",
            EntityKind::Tag => "tags",
            EntityKind::ActivityLog => "activity_logs",
        }
    }

    /// URL segment the resource is mounted under.
    pub fn path_segment(self) -> &'static str {
        match self {
            EntityKind::ActivityLog => "activity-logs",
            other => other.table(),
        }
    }

    /// Human-readable singular name, used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Profile => "profile",
            EntityKind::Conversation => "conversation",
            EntityKind::Message => "message",
            EntityKind::Document => "document",
            EntityKind::Tag => "tag",
            EntityKind::ActivityLog => "activity log",
        }
    }

    pub fn descriptor(self) -> &'static EntityDescriptor {
        match self {
            EntityKind::Profile => &PROFILE,
            EntityKind::Conversation => &CONVERSATION,
            EntityKind::Message => &MESSAGE,
            EntityKind::Document => &DOCUMENT,
            EntityKind::Tag => &TAG,
            EntityKind::ActivityLog => &ACTIVITY_LOG,
        }
    }

    pub fn secret_fields(self) -> impl Iterator<Item = &'static str> {
        self.descriptor().fields.iter().filter(|spec| spec.secret).map(|spec| spec.name)
    }
}

/// Removes secret fields from a record read back from the database.
pub fn strip_secrets(kind: EntityKind, record: &mut Value) {
    if let Value::Object(map) = record {
        for field in kind.secret_fields() {
            map.remove(field);
        }
    }
}
