#![allow(dead_code)]

use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseBackend as DbBackend, Statement};
use serde_json::{json, Value};
use uuid::Uuid;

use salon_ledger::{
    commands::CreateCustomerCommand,
    common::CurrentUser,
    db::{self, DbConfig},
    store::{MemoryStore, RecordStore, Row, SeaOrmStore, Table},
};

const SCHEMA: [&str; 5] = [
    r#"CREATE TABLE customers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        phone1 TEXT NOT NULL,
        phone2 TEXT,
        gender TEXT NOT NULL,
        dob TEXT NOT NULL,
        anniversary_date TEXT,
        address TEXT NOT NULL,
        pincode TEXT NOT NULL,
        "UID" TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT,
        last_activity_at TEXT
    )"#,
    r#"CREATE TABLE staff (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email_id TEXT NOT NULL,
        phone_number1 TEXT NOT NULL,
        phone_number2 TEXT,
        gender TEXT NOT NULL,
        date_of_birth TEXT NOT NULL,
        address TEXT NOT NULL,
        pincode TEXT NOT NULL,
        "UID" TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT
    )"#,
    r#"CREATE TABLE services (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    )"#,
    r#"CREATE TABLE appointments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER NOT NULL,
        services TEXT NOT NULL,
        appointment_date TEXT NOT NULL,
        appointment_time TEXT,
        advance_paid TEXT,
        is_cancelled INTEGER NOT NULL DEFAULT 0,
        is_done INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL,
        "UID" TEXT,
        created_at TEXT
    )"#,
    r#"CREATE TABLE purchases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER NOT NULL,
        amount TEXT
    )"#,
];

/// A SQLite-backed store on a private in-memory database with the salon schema.
pub async fn sqlite_store() -> Arc<SeaOrmStore> {
    let pool = db::connect(&DbConfig::sqlite_in_memory())
        .await
        .expect("in-memory sqlite connects");

    for sql in SCHEMA {
        pool.execute(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
            .await
            .expect("schema statement runs");
    }

    Arc::new(SeaOrmStore::new(Arc::new(pool)))
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub fn actor() -> CurrentUser {
    CurrentUser::new(Uuid::new_v4())
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().expect("fixture is a JSON object")
}

pub fn customer_form(name: &str, email: &str) -> CreateCustomerCommand {
    CreateCustomerCommand {
        name: name.to_string(),
        email: email.to_string(),
        phone1: "9876543210".to_string(),
        phone2: None,
        gender: "female".to_string(),
        dob: "1991-11-02".to_string(),
        anniversary_date: Some("2016-02-14".to_string()),
        address: "18 Residency Road".to_string(),
        pincode: "560025".to_string(),
    }
}

/// A complete customer row with explicit timestamps.
pub fn customer_row(id: i64, name: &str, created_at: &str, last_activity_at: Option<&str>) -> Row {
    row(json!({
        "id": id,
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        "phone1": "9000000000",
        "phone2": null,
        "gender": "other",
        "dob": "1990-01-01",
        "anniversary_date": null,
        "address": "7 Brigade Road",
        "pincode": "560001",
        "UID": null,
        "created_at": created_at,
        "updated_at": null,
        "last_activity_at": last_activity_at,
    }))
}

pub fn purchase_row(customer_id: i64, amount: &str) -> Row {
    row(json!({"customer_id": customer_id, "amount": amount}))
}

pub fn appointment_row(customer_id: i64, date: &str, status: &str) -> Row {
    row(json!({
        "customer_id": customer_id,
        "services": "[{\"service_id\":1,\"staff_id\":1}]",
        "appointment_date": date,
        "appointment_time": "10:00",
        "advance_paid": "0",
        "is_cancelled": status == "cancelled",
        "is_done": false,
        "status": status,
    }))
}

pub async fn seed(store: &dyn RecordStore, table: Table, rows: Vec<Row>) {
    for row in rows {
        store.insert(table, row).await.expect("fixture row inserts");
    }
}
