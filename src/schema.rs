//! The stock convergence plan for the resource-sharing platform schema.
//!
//! One plan covers the whole database: extension, the `user_sn_seq`
//! sequence, fourteen tables grown column by column, the retrofitted
//! uniqueness constraints over possibly-duplicated data, the serial-number
//! backfill, the full index set, and the `updated_at` touch triggers.
//!
//! Tables are created with only their identity columns; every other column
//! arrives through an [`AddColumn`] step. A database that stopped at any
//! intermediate shape converges to the same final schema as a fresh one.

use crate::backfill::SequenceBackfill;
use crate::core::SchemaStep;
use crate::error::Error;
use crate::plan::MigrationPlan;
use crate::step::{
    AddColumn, AddConstraint, AttachTrigger, CreateIndex, CreateSequence, CreateTable,
    EnableExtension, InstallTouchFunction,
};

const ID_COLUMN: &str = "id UUID PRIMARY KEY DEFAULT gen_random_uuid()";
const CREATED_AT_COLUMN: &str = "created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP";

/// Build the platform's full convergence plan.
pub fn stock_plan() -> Result<MigrationPlan, Error> {
    let mut steps: Vec<Box<dyn SchemaStep>> = vec![
        Box::new(EnableExtension::new("pgcrypto")),
        Box::new(CreateSequence::new("user_sn_seq", 1)),
    ];

    tables(&mut steps);
    columns(&mut steps);
    constraints(&mut steps);

    steps.push(Box::new(SequenceBackfill::new("users", "sn", "user_sn_seq")));

    indexes(&mut steps);
    triggers(&mut steps);

    MigrationPlan::new(steps)
}

fn tables(steps: &mut Vec<Box<dyn SchemaStep>>) {
    steps.push(Box::new(CreateTable::new(
        "users",
        &[ID_COLUMN, CREATED_AT_COLUMN],
    )));
    steps.push(Box::new(CreateTable::new(
        "resources",
        &[ID_COLUMN, CREATED_AT_COLUMN],
    )));
    steps.push(Box::new(
        CreateTable::new(
            "resource_stats",
            &["resource_id UUID PRIMARY KEY REFERENCES resources(id) ON DELETE CASCADE"],
        )
        .with_reference("resources"),
    ));
    steps.push(Box::new(CreateTable::new(
        "ratings",
        &[ID_COLUMN, CREATED_AT_COLUMN],
    )));
    steps.push(Box::new(CreateTable::new("likes", &[CREATED_AT_COLUMN])));
    steps.push(Box::new(CreateTable::new(
        "comments",
        &[ID_COLUMN, CREATED_AT_COLUMN],
    )));
    steps.push(Box::new(CreateTable::new(
        "favorites",
        &[ID_COLUMN, CREATED_AT_COLUMN],
    )));
    steps.push(Box::new(CreateTable::new(
        "favorite_resources",
        &["added_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP"],
    )));
    steps.push(Box::new(CreateTable::new(
        "claims",
        &[ID_COLUMN, CREATED_AT_COLUMN],
    )));
    steps.push(Box::new(CreateTable::new(
        "notifications",
        &[ID_COLUMN, CREATED_AT_COLUMN],
    )));
    steps.push(Box::new(CreateTable::new(
        "notification_reads",
        &[ID_COLUMN, "read_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP"],
    )));
    steps.push(Box::new(CreateTable::new(
        "audit_logs",
        &[ID_COLUMN, CREATED_AT_COLUMN],
    )));
    steps.push(Box::new(CreateTable::new(
        "download_logs",
        &[ID_COLUMN, "downloaded_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP"],
    )));
    steps.push(Box::new(CreateTable::new(
        "images",
        &[ID_COLUMN, CREATED_AT_COLUMN],
    )));
}

fn columns(steps: &mut Vec<Box<dyn SchemaStep>>) {
    // users
    steps.push(Box::new(AddColumn::plain("users", "sn", "BIGINT").unique()));
    // Volatile default: each existing row gets a distinct placeholder, so
    // the inline UNIQUE holds even on a populated table.
    steps.push(Box::new(
        AddColumn::plain("users", "username", "VARCHAR(50)")
            .unique()
            .not_null()
            .default_sql("'temp_' || gen_random_uuid()"),
    ));
    steps.push(Box::new(
        AddColumn::plain("users", "password_hash", "VARCHAR(255)")
            .not_null()
            .default_sql("''"),
    ));
    steps.push(Box::new(
        AddColumn::plain("users", "email", "VARCHAR(255)").unique(),
    ));
    steps.push(Box::new(
        AddColumn::plain("users", "role", "VARCHAR(20)").default_sql("'user'"),
    ));
    steps.push(Box::new(AddColumn::plain("users", "bio", "TEXT")));
    steps.push(Box::new(
        AddColumn::plain("users", "social_links", "JSONB").default_sql("'{}'"),
    ));
    steps.push(Box::new(
        AddColumn::plain("users", "real_info", "JSONB").default_sql("'{}'"),
    ));
    steps.push(Box::new(
        AddColumn::plain("users", "is_verified", "BOOLEAN").default_sql("FALSE"),
    ));
    steps.push(Box::new(
        AddColumn::plain("users", "is_active", "BOOLEAN").default_sql("TRUE"),
    ));
    steps.push(Box::new(AddColumn::plain("users", "avatar_url", "VARCHAR(500)")));
    steps.push(Box::new(
        AddColumn::plain("users", "updated_at", "TIMESTAMP").default_sql("CURRENT_TIMESTAMP"),
    ));

    // resources
    steps.push(Box::new(
        AddColumn::plain("resources", "title", "VARCHAR(255)")
            .not_null()
            .default_sql("''"),
    ));
    steps.push(Box::new(AddColumn::foreign_key("resources", "author_id", "users")));
    steps.push(Box::new(
        AddColumn::foreign_key("resources", "uploader_id", "users").required(),
    ));
    steps.push(Box::new(AddColumn::plain(
        "resources",
        "course_name",
        "VARCHAR(255)",
    )));
    steps.push(Box::new(AddColumn::plain(
        "resources",
        "resource_type",
        "VARCHAR(50)",
    )));
    steps.push(Box::new(AddColumn::plain("resources", "category", "VARCHAR(50)")));
    steps.push(Box::new(
        AddColumn::plain("resources", "tags", "JSONB").default_sql("'[]'"),
    ));
    steps.push(Box::new(AddColumn::plain(
        "resources",
        "file_path",
        "VARCHAR(500)",
    )));
    steps.push(Box::new(AddColumn::plain(
        "resources",
        "source_file_path",
        "VARCHAR(500)",
    )));
    steps.push(Box::new(AddColumn::plain("resources", "file_hash", "VARCHAR(64)")));
    steps.push(Box::new(AddColumn::plain("resources", "file_size", "BIGINT")));
    steps.push(Box::new(AddColumn::plain(
        "resources",
        "content_accuracy",
        "FLOAT8",
    )));
    steps.push(Box::new(
        AddColumn::plain("resources", "audit_status", "VARCHAR(20)").default_sql("'pending'"),
    ));
    steps.push(Box::new(AddColumn::plain("resources", "ai_reject_reason", "TEXT")));
    steps.push(Box::new(
        AddColumn::plain("resources", "updated_at", "TIMESTAMP").default_sql("CURRENT_TIMESTAMP"),
    ));

    // resource_stats: counter pairs per rating dimension
    for counter in [
        "views",
        "downloads",
        "likes",
        "rating_count",
        "difficulty_total",
        "difficulty_count",
        "overall_quality_total",
        "overall_quality_count",
        "answer_quality_total",
        "answer_quality_count",
        "format_quality_total",
        "format_quality_count",
        "detail_level_total",
        "detail_level_count",
    ] {
        steps.push(Box::new(
            AddColumn::plain("resource_stats", counter, "INTEGER").default_sql("0"),
        ));
    }

    // ratings
    steps.push(Box::new(
        AddColumn::foreign_key("ratings", "resource_id", "resources")
            .required()
            .on_delete_cascade(),
    ));
    steps.push(Box::new(
        AddColumn::foreign_key("ratings", "user_id", "users")
            .required()
            .on_delete_cascade(),
    ));
    for dimension in [
        "difficulty",
        "overall_quality",
        "answer_quality",
        "format_quality",
        "detail_level",
    ] {
        steps.push(Box::new(
            AddColumn::plain("ratings", dimension, "INTEGER")
                .check(format!("{} BETWEEN 1 AND 10", dimension)),
        ));
    }
    steps.push(Box::new(
        AddColumn::plain("ratings", "updated_at", "TIMESTAMP").default_sql("CURRENT_TIMESTAMP"),
    ));

    // likes
    steps.push(Box::new(
        AddColumn::foreign_key("likes", "resource_id", "resources").on_delete_cascade(),
    ));
    steps.push(Box::new(
        AddColumn::foreign_key("likes", "user_id", "users").on_delete_cascade(),
    ));

    // comments
    steps.push(Box::new(
        AddColumn::foreign_key("comments", "resource_id", "resources")
            .required()
            .on_delete_cascade(),
    ));
    steps.push(Box::new(
        AddColumn::foreign_key("comments", "user_id", "users")
            .required()
            .on_delete_cascade(),
    ));
    steps.push(Box::new(
        AddColumn::plain("comments", "content", "TEXT")
            .not_null()
            .default_sql("''"),
    ));
    steps.push(Box::new(
        AddColumn::plain("comments", "audit_status", "VARCHAR(20)").default_sql("'approved'"),
    ));
    steps.push(Box::new(
        AddColumn::plain("comments", "updated_at", "TIMESTAMP").default_sql("CURRENT_TIMESTAMP"),
    ));

    // favorites
    steps.push(Box::new(
        AddColumn::foreign_key("favorites", "user_id", "users")
            .required()
            .on_delete_cascade(),
    ));
    steps.push(Box::new(
        AddColumn::plain("favorites", "name", "VARCHAR(255)")
            .not_null()
            .default_sql("'untitled'"),
    ));

    // favorite_resources
    steps.push(Box::new(
        AddColumn::foreign_key("favorite_resources", "favorite_id", "favorites")
            .on_delete_cascade(),
    ));
    steps.push(Box::new(
        AddColumn::foreign_key("favorite_resources", "resource_id", "resources")
            .on_delete_cascade(),
    ));

    // claims
    steps.push(Box::new(
        AddColumn::foreign_key("claims", "resource_id", "resources")
            .required()
            .on_delete_cascade(),
    ));
    steps.push(Box::new(
        AddColumn::foreign_key("claims", "applicant_id", "users")
            .required()
            .on_delete_cascade(),
    ));
    steps.push(Box::new(AddColumn::plain("claims", "claim_type", "VARCHAR(20)")));
    steps.push(Box::new(
        AddColumn::plain("claims", "reason", "TEXT")
            .not_null()
            .default_sql("''"),
    ));
    steps.push(Box::new(
        AddColumn::plain("claims", "proof_files", "JSONB").default_sql("'[]'"),
    ));
    steps.push(Box::new(
        AddColumn::plain("claims", "status", "VARCHAR(20)").default_sql("'pending'"),
    ));
    steps.push(Box::new(AddColumn::foreign_key("claims", "reviewer_id", "users")));
    steps.push(Box::new(AddColumn::plain("claims", "reviewed_at", "TIMESTAMP")));

    // notifications
    steps.push(Box::new(
        AddColumn::foreign_key("notifications", "recipient_id", "users").on_delete_cascade(),
    ));
    steps.push(Box::new(
        AddColumn::plain("notifications", "title", "VARCHAR(255)")
            .not_null()
            .default_sql("''"),
    ));
    steps.push(Box::new(
        AddColumn::plain("notifications", "content", "TEXT")
            .not_null()
            .default_sql("''"),
    ));
    steps.push(Box::new(AddColumn::plain(
        "notifications",
        "notification_type",
        "VARCHAR(50)",
    )));
    steps.push(Box::new(
        AddColumn::plain("notifications", "priority", "VARCHAR(20)").default_sql("'normal'"),
    ));
    steps.push(Box::new(
        AddColumn::plain("notifications", "is_read", "BOOLEAN").default_sql("FALSE"),
    ));
    steps.push(Box::new(AddColumn::plain(
        "notifications",
        "link_url",
        "VARCHAR(500)",
    )));

    // notification_reads
    steps.push(Box::new(
        AddColumn::foreign_key("notification_reads", "notification_id", "notifications")
            .required()
            .on_delete_cascade(),
    ));
    steps.push(Box::new(
        AddColumn::foreign_key("notification_reads", "user_id", "users")
            .required()
            .on_delete_cascade(),
    ));

    // audit_logs
    steps.push(Box::new(AddColumn::foreign_key("audit_logs", "user_id", "users")));
    steps.push(Box::new(
        AddColumn::plain("audit_logs", "action", "VARCHAR(100)")
            .not_null()
            .default_sql("''"),
    ));
    steps.push(Box::new(AddColumn::plain(
        "audit_logs",
        "target_type",
        "VARCHAR(50)",
    )));
    steps.push(Box::new(AddColumn::plain("audit_logs", "target_id", "UUID")));
    steps.push(Box::new(
        AddColumn::plain("audit_logs", "details", "JSONB").default_sql("'{}'"),
    ));
    steps.push(Box::new(AddColumn::plain("audit_logs", "ip_address", "INET")));

    // download_logs
    steps.push(Box::new(
        AddColumn::foreign_key("download_logs", "resource_id", "resources")
            .required()
            .on_delete_cascade(),
    ));
    steps.push(Box::new(
        AddColumn::foreign_key("download_logs", "user_id", "users").on_delete_set_null(),
    ));
    steps.push(Box::new(
        AddColumn::plain("download_logs", "ip_address", "INET")
            .not_null()
            .default_sql("'0.0.0.0'"),
    ));

    // images
    steps.push(Box::new(
        AddColumn::foreign_key("images", "uploader_id", "users").required(),
    ));
    steps.push(Box::new(
        AddColumn::plain("images", "file_path", "VARCHAR(500)")
            .not_null()
            .default_sql("''"),
    ));
    steps.push(Box::new(AddColumn::plain(
        "images",
        "original_name",
        "VARCHAR(255)",
    )));
    steps.push(Box::new(AddColumn::plain("images", "file_size", "INTEGER")));
    steps.push(Box::new(AddColumn::plain("images", "mime_type", "VARCHAR(50)")));
}

fn constraints(steps: &mut Vec<Box<dyn SchemaStep>>) {
    steps.push(Box::new(AddConstraint::unique(
        "ratings",
        "ratings_resource_id_user_id_key",
        &["resource_id", "user_id"],
    )));
    steps.push(Box::new(AddConstraint::primary_key(
        "likes",
        &["resource_id", "user_id"],
    )));
    steps.push(Box::new(AddConstraint::primary_key(
        "favorite_resources",
        &["favorite_id", "resource_id"],
    )));
    steps.push(Box::new(AddConstraint::unique(
        "notification_reads",
        "notification_reads_notification_id_user_id_key",
        &["notification_id", "user_id"],
    )));
}

fn indexes(steps: &mut Vec<Box<dyn SchemaStep>>) {
    let btree: &[(&str, &str, &[&str])] = &[
        ("idx_users_role", "users", &["role"]),
        ("idx_users_is_verified", "users", &["is_verified"]),
        ("idx_users_sn", "users", &["sn"]),
        ("idx_resources_uploader", "resources", &["uploader_id"]),
        ("idx_resources_author", "resources", &["author_id"]),
        ("idx_resources_course", "resources", &["course_name"]),
        ("idx_resources_type", "resources", &["resource_type"]),
        ("idx_resources_category", "resources", &["category"]),
        ("idx_resources_audit_status", "resources", &["audit_status"]),
        ("idx_resources_created_at", "resources", &["created_at DESC"]),
        ("idx_ratings_resource", "ratings", &["resource_id"]),
        ("idx_ratings_user", "ratings", &["user_id"]),
        ("idx_likes_user", "likes", &["user_id"]),
        ("idx_comments_resource", "comments", &["resource_id"]),
        ("idx_comments_user", "comments", &["user_id"]),
        ("idx_comments_created_at", "comments", &["created_at DESC"]),
        ("idx_favorites_user", "favorites", &["user_id"]),
        ("idx_fav_res_resource", "favorite_resources", &["resource_id"]),
        ("idx_claims_resource", "claims", &["resource_id"]),
        ("idx_claims_applicant", "claims", &["applicant_id"]),
        ("idx_claims_status", "claims", &["status"]),
        ("idx_notifications_recipient", "notifications", &["recipient_id"]),
        ("idx_notifications_priority", "notifications", &["priority"]),
        ("idx_notifications_is_read", "notifications", &["is_read"]),
        ("idx_notifications_created_at", "notifications", &["created_at DESC"]),
        (
            "idx_notification_reads_notification",
            "notification_reads",
            &["notification_id"],
        ),
        ("idx_notification_reads_user", "notification_reads", &["user_id"]),
        (
            "idx_notification_reads_unique",
            "notification_reads",
            &["notification_id", "user_id"],
        ),
        ("idx_audit_logs_user", "audit_logs", &["user_id"]),
        ("idx_audit_logs_action", "audit_logs", &["action"]),
        ("idx_audit_logs_created_at", "audit_logs", &["created_at DESC"]),
        ("idx_download_logs_resource", "download_logs", &["resource_id"]),
        ("idx_download_logs_user", "download_logs", &["user_id"]),
        ("idx_download_logs_time", "download_logs", &["downloaded_at DESC"]),
        ("idx_images_uploader", "images", &["uploader_id"]),
    ];
    for (index, table, columns) in btree {
        steps.push(Box::new(CreateIndex::new(*index, *table, columns)));
    }

    steps.push(Box::new(
        CreateIndex::new("idx_resources_tags", "resources", &["tags"]).gin(),
    ));
}

fn triggers(steps: &mut Vec<Box<dyn SchemaStep>>) {
    steps.push(Box::new(InstallTouchFunction::new(
        "update_updated_at_column",
        "updated_at",
    )));
    for table in ["users", "resources", "ratings", "comments"] {
        steps.push(Box::new(AttachTrigger::new(
            format!("update_{}_updated_at", table),
            table,
            "update_updated_at_column",
        )));
    }
}
