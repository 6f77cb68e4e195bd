//! Shared fixtures for integration tests

use bulk_loading_sdk::{
    BulkRecord, BulkWriter, FieldDef, MemoryBulkCopy, MemoryStore, SqlValue,
};

/// Canonical test record matching the Users table
pub struct User {
    pub id: i64,
    pub name: String,
    pub active: bool,
}

pub static USER_FIELDS: [FieldDef; 3] = [
    FieldDef::new("id", "i64"),
    FieldDef::new("name", "string"),
    FieldDef::new("active", "bool"),
];

impl BulkRecord for User {
    const TABLE: Option<&'static str> = Some("Users");

    fn fields() -> &'static [FieldDef] {
        &USER_FIELDS
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.id.into(), self.name.as_str().into(), self.active.into()]
    }
}

pub fn user(id: i64, name: &str, active: bool) -> User {
    User {
        id,
        name: name.to_string(),
        active,
    }
}

pub fn sample_users() -> Vec<User> {
    vec![user(1, "ada", true), user(2, "grace", false)]
}

/// Store with an empty Users table in place
pub fn store_with_users_table() -> MemoryStore {
    let store = MemoryStore::new();
    store.create_table("Users", &["id", "name", "active"]);
    store
}

/// Store whose Users table already holds the sample rows
pub fn store_with_seeded_users() -> MemoryStore {
    let store = store_with_users_table();
    for user in sample_users() {
        store
            .insert_row("Users", user.values())
            .expect("seeding Users table");
    }
    store
}

/// Writer sharing state with the given store
pub fn writer_over(store: &MemoryStore) -> BulkWriter<MemoryStore, MemoryBulkCopy> {
    BulkWriter::new(store.clone(), MemoryBulkCopy)
}
