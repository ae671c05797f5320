//! End-to-end tests for the facade over a SQLite database on disk.

use futures::StreamExt;
use sqlbridge::coerce::{convert, convert_or};
use sqlbridge::{
    ConnectionConfig, ConnectionParams, Database, EntityMapper, Provider, Row, SqlType,
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Account {
    id: i64,
    owner: String,
    balance: f64,
    closed: bool,
}

fn account(row: &Row) -> Account {
    Account {
        id: convert(row.get_named_or_null("id")),
        owner: convert(row.get_named_or_null("owner")),
        balance: convert(row.get_named_or_null("balance")),
        closed: convert_or(row.get_named_or_null("closed"), false),
    }
}

fn file_database(dir: &tempfile::TempDir) -> Database {
    let path = dir.path().join("accounts.db");
    Database::new(ConnectionConfig::new(
        Provider::Sqlite,
        ConnectionParams::file(path, false),
    ))
    .unwrap()
}

async fn seed(db: &Database) {
    let mut create = db
        .sql_text(
            "CREATE TABLE accounts (
                 id INTEGER PRIMARY KEY,
                 owner TEXT NOT NULL,
                 balance REAL NOT NULL DEFAULT 0,
                 closed BOOLEAN NOT NULL DEFAULT 0
             )",
        )
        .unwrap();
    db.execute_non_query(&mut create).await.unwrap();

    for (id, owner, balance, closed) in [
        (1i64, "ada", 125.5f64, false),
        (2, "grace", 0.0, false),
        (3, "alan", 42.0, true),
    ] {
        let mut insert = db
            .sql_text(
                "INSERT INTO accounts (id, owner, balance, closed)
                 VALUES (@id, @owner, @balance, @closed)",
            )
            .unwrap();
        insert
            .add_in_parameter("id", SqlType::BigInt, id)
            .unwrap()
            .add_in_parameter("owner", SqlType::Text, owner)
            .unwrap()
            .add_in_parameter("balance", SqlType::Double, balance)
            .unwrap()
            .add_in_parameter("closed", SqlType::Bool, closed)
            .unwrap();
        assert_eq!(db.execute_non_query(&mut insert).await.unwrap(), 1);
    }
}

#[test]
fn facade_maps_rows_to_entities() {
    smol::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let db = file_database(&dir);
        db.connect().await.unwrap();
        seed(&db).await;

        let select = db
            .sql_text("SELECT id, owner, balance, closed FROM accounts ORDER BY id")
            .unwrap();
        let result = db.execute_result(&select).await.unwrap();
        assert_eq!(result.row_count(), 3);

        let mapper = EntityMapper::new(account);
        let accounts = mapper.map_rows(&result.rows);
        assert_eq!(accounts.len(), 3);
        assert_eq!(accounts[0].owner, "ada");
        assert_eq!(accounts[0].balance, 125.5);
        assert!(accounts[2].closed);

        // Mapping a missing row is the default entity, not a panic.
        assert_eq!(mapper.map_row(None), Account::default());

        db.close().await.unwrap();
    });
}

#[test]
fn facade_streams_lazily_and_in_order() {
    smol::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let db = file_database(&dir);
        db.connect().await.unwrap();
        seed(&db).await;

        let select = db
            .sql_text("SELECT id, owner, balance, closed FROM accounts ORDER BY id")
            .unwrap();
        let reader = db.execute_reader(&select).await.unwrap();
        let mapper = EntityMapper::new(account);
        let mut stream = mapper.map_stream(reader);

        let mut ids = Vec::new();
        while let Some(item) = stream.next().await {
            ids.push(item.unwrap().id);
        }
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(stream.next().await.is_none());

        db.close().await.unwrap();
    });
}

#[test]
fn dropped_reader_abandons_cursor() {
    smol::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let db = file_database(&dir);
        db.connect().await.unwrap();
        seed(&db).await;

        let select = db.sql_text("SELECT id FROM accounts ORDER BY id").unwrap();
        let mut reader = db.execute_reader(&select).await.unwrap();
        let first = reader.next().await.unwrap().unwrap();
        assert_eq!(convert::<i64>(first.get_or_null(0)), 1);
        drop(reader);

        // The connection is still usable for new commands.
        let count = db
            .execute_row(&db.sql_text("SELECT count(*) FROM accounts").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(convert::<i64>(count.get_or_null(0)), 3);

        db.close().await.unwrap();
    });
}

#[test]
fn update_reports_affected_rows_and_nulls_round_trip() {
    smol::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let db = file_database(&dir);
        db.connect().await.unwrap();
        seed(&db).await;

        let mut close_all = db
            .sql_text("UPDATE accounts SET closed = @closed WHERE closed = @open")
            .unwrap();
        close_all
            .add_in_parameter("closed", SqlType::Bool, true)
            .unwrap()
            .add_in_parameter("open", SqlType::Bool, false)
            .unwrap();
        assert_eq!(db.execute_non_query(&mut close_all).await.unwrap(), 2);

        let mut add_note = db
            .sql_text("ALTER TABLE accounts ADD COLUMN note TEXT")
            .unwrap();
        db.execute_non_query(&mut add_note).await.unwrap();

        let mut set_note = db
            .sql_text("UPDATE accounts SET note = @note WHERE id = @id")
            .unwrap();
        set_note
            .add_in_parameter("note", SqlType::Text, Option::<String>::None)
            .unwrap()
            .add_in_parameter("id", SqlType::BigInt, 1i64)
            .unwrap();
        db.execute_non_query(&mut set_note).await.unwrap();

        let row = db
            .execute_row(&db.sql_text("SELECT note FROM accounts WHERE id = 1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(row.get_or_null(0).is_null());
        // Coercing the NULL is the caller default, never an error.
        assert_eq!(convert_or(row.get_or_null(0), "none".to_string()), "none");

        db.close().await.unwrap();
    });
}

#[test]
fn execute_table_fills_a_data_table() {
    smol::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let db = file_database(&dir);
        db.connect().await.unwrap();
        seed(&db).await;

        let mut select = db
            .sql_text("SELECT id, owner FROM accounts WHERE closed = @closed ORDER BY id")
            .unwrap();
        select
            .add_in_parameter("closed", SqlType::Bool, false)
            .unwrap();

        let table = db.execute_table("open_accounts", &select).await.unwrap();
        assert_eq!(table.name(), "open_accounts");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.columns()[0].name(), "id");
        assert_eq!(table.column_index("owner"), Some(1));

        // The table views back as a result set for mapping.
        let as_result = table.to_result_set();
        let owners: Vec<String> = sqlbridge::mapper::read_rows(&as_result.rows, |row| {
            convert::<String>(row.get_named_or_null("owner"))
        });
        assert_eq!(owners, vec!["ada".to_string(), "grace".to_string()]);

        db.close().await.unwrap();
    });
}

#[test]
fn provider_errors_pass_through_unchanged() {
    smol::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let db = file_database(&dir);
        db.connect().await.unwrap();
        seed(&db).await;

        // Unique violation comes straight from the client library.
        let mut duplicate = db
            .sql_text("INSERT INTO accounts (id, owner) VALUES (@id, @owner)")
            .unwrap();
        duplicate
            .add_in_parameter("id", SqlType::BigInt, 1i64)
            .unwrap()
            .add_in_parameter("owner", SqlType::Text, "imposter")
            .unwrap();
        let err = db.execute_non_query(&mut duplicate).await.unwrap_err();
        assert!(matches!(err, sqlbridge::Error::Sqlx(_)));

        // Referencing an undeclared parameter fails before any I/O.
        let mut unbound = db
            .sql_text("SELECT * FROM accounts WHERE id = @missing")
            .unwrap();
        let err = db.execute_non_query(&mut unbound).await.unwrap_err();
        assert!(matches!(err, sqlbridge::Error::UnknownParameter(_)));

        db.close().await.unwrap();
    });
}

#[test]
fn data_survives_reopen() {
    smol::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = file_database(&dir);
            db.connect().await.unwrap();
            seed(&db).await;
            db.close().await.unwrap();
        }

        let db = file_database(&dir);
        db.connect().await.unwrap();
        let row = db
            .execute_row(&db.sql_text("SELECT count(*) FROM accounts").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(convert::<i64>(row.get_or_null(0)), 3);
        db.close().await.unwrap();

        assert!(!db.is_connected().await);
        let mut after_close = db.sql_text("SELECT 1").unwrap();
        let err = db.execute_non_query(&mut after_close).await.unwrap_err();
        assert!(matches!(err, sqlbridge::Error::NotConnected));
    });
}

#[test]
fn coercion_examples_hold_end_to_end() {
    smol::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let db = file_database(&dir);
        db.connect().await.unwrap();

        let row = db
            .execute_row(
                &db.sql_text("SELECT 'true' AS flag, '17' AS n, 'notabool' AS bad")
                    .unwrap(),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(convert::<bool>(row.get_named_or_null("flag")), true);
        assert_eq!(convert::<i32>(row.get_named_or_null("n")), 17);
        assert_eq!(convert::<bool>(row.get_named_or_null("bad")), false);
        assert_eq!(convert_or(row.get_named_or_null("bad"), true), true);

        db.close().await.unwrap();
    });
}
