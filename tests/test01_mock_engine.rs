#![cfg(all(feature = "mysql", feature = "mssql"))]

use std::time::Duration;

use sql_provider::prelude::*;
use sql_provider::test_utils::{MockConnection, MockEvent, MockResponse, mock_service};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Clone, PartialEq)]
struct Person {
    id: i32,
    name: Option<String>,
}

sql_provider::map_row!(Person {
    id => "Id",
    name => "Name",
});

fn people() -> MockResponse {
    MockResponse::table(
        &["id", "NAME", "Extra"],
        vec![
            vec![
                RowValues::Int(1),
                RowValues::Text("alice".into()),
                RowValues::Bool(true),
            ],
            vec![RowValues::Int(2), RowValues::Null, RowValues::Bool(false)],
        ],
    )
}

#[test]
fn test01_operations_open_on_demand_and_track_transactions() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let (mut service, handle) = mock_service(DatabaseType::MySql)?;
        assert_eq!(service.state(), ConnectionState::Closed);

        handle.push_response(MockResponse::rows_affected(3));
        let rows = service
            .execute_non_query("DELETE FROM t", Vec::new(), &CommandOptions::default())
            .await?;
        assert_eq!(rows, 3);
        assert_eq!(service.state(), ConnectionState::Open);

        let tx = service.begin_transaction(None).await?;
        assert_eq!(service.state(), ConnectionState::InTransaction);
        service
            .execute_non_query("UPDATE t SET a = 1", Vec::new(), &CommandOptions::default())
            .await?;
        service.commit_transaction(None).await?;
        assert_eq!(service.state(), ConnectionState::Open);

        let executed = handle.executed();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0].transaction, None);
        assert_eq!(executed[1].transaction, Some(tx));
        assert_eq!(handle.count(&MockEvent::Open), 1);
        assert_eq!(handle.count(&MockEvent::Commit), 1);

        let err = service.commit_transaction(None).await.unwrap_err();
        assert!(matches!(err, SqlProviderError::NoActiveTransaction));
        let err = service.rollback_transaction(None).await.unwrap_err();
        assert!(matches!(err, SqlProviderError::NoActiveTransaction));

        service.close().await?;
        assert_eq!(service.state(), ConnectionState::Closed);
        Ok::<(), SqlProviderError>(())
    })?;
    Ok(())
}

#[test]
fn test01_begin_while_active_replaces_reference() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let (mut service, handle) = mock_service(DatabaseType::Mssql)?;
        let first = service.begin_transaction(None).await?;
        let second = service.begin_transaction(None).await?;
        assert_ne!(first, second);
        assert_eq!(service.active_transaction(), Some(second));

        service.rollback_transaction(None).await?;
        assert_eq!(service.active_transaction(), None);
        assert_eq!(handle.count(&MockEvent::Begin), 2);
        assert_eq!(handle.count(&MockEvent::Rollback), 1);
        Ok::<(), SqlProviderError>(())
    })?;
    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Account {
    id: i32,
    balance: rust_decimal::Decimal,
}

sql_provider::map_row!(Account {
    id => "id",
    balance => "balance",
});

#[test]
fn test01_committed_debit_is_visible_to_the_next_select() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let (mut service, handle) = mock_service(DatabaseType::MySql)?;
        let tx = service.begin_transaction(None).await?;

        handle.push_response(MockResponse::rows_affected(1));
        let id = service.create_input_parameter("@id", RowValues::Int(4), DbType::Int32, false);
        let updated = service
            .execute_non_query(
                "UPDATE accounts SET balance = balance - 10 WHERE id = @id",
                vec![id],
                &CommandOptions::default(),
            )
            .await?;
        assert_eq!(updated, 1);
        service.commit_transaction(None).await?;
        assert_eq!(service.state(), ConnectionState::Open);

        handle.push_response(MockResponse::table(
            &["id", "balance"],
            vec![vec![
                RowValues::Int(4),
                RowValues::Decimal(rust_decimal::Decimal::new(4000, 2)),
            ]],
        ));
        let id = service.create_input_parameter("@id", RowValues::Int(4), DbType::Int32, false);
        let account: Account = service
            .select_first_or_default(
                "SELECT id, balance FROM accounts WHERE id = @id",
                vec![id],
                &CommandOptions::default(),
            )
            .await?;
        assert_eq!(
            account,
            Account {
                id: 4,
                balance: rust_decimal::Decimal::new(4000, 2),
            }
        );

        let executed = handle.executed();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0].transaction, Some(tx));
        assert_eq!(executed[0].parameters[0].value, RowValues::Int(4));
        assert_eq!(executed[1].transaction, None);
        let events = handle.events();
        let commit_at = events.iter().position(|e| *e == MockEvent::Commit);
        let select_at = events.iter().position(|e| matches!(e, MockEvent::Reader(_)));
        assert!(commit_at < select_at);
        Ok::<(), SqlProviderError>(())
    })?;
    Ok(())
}

#[test]
fn test01_prepare_runs_before_kind_and_timeout_are_set() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let (mut service, handle) = mock_service(DatabaseType::MySql)?;
        let options = CommandOptions::default()
            .with_prepare(true)
            .with_kind(CommandKind::StoredProcedure)
            .with_timeout(5);
        service
            .execute_non_query("archive_orders", Vec::new(), &options)
            .await?;

        let events = handle.events();
        let prepared = events
            .iter()
            .find_map(|e| match e {
                MockEvent::Prepare(c) => Some(c.clone()),
                _ => None,
            })
            .expect("prepare was recorded");
        assert_eq!(prepared.kind, CommandKind::Text);
        assert_eq!(prepared.timeout, None);

        let executed = &handle.executed()[0];
        assert_eq!(executed.kind, CommandKind::StoredProcedure);
        assert_eq!(executed.timeout, Some(5));
        assert!(executed.prepared);
        Ok::<(), SqlProviderError>(())
    })?;
    Ok(())
}

#[test]
fn test01_select_maps_columns_case_insensitively() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let (mut service, handle) = mock_service(DatabaseType::MySql)?;
        handle.push_response(people());
        let found: Vec<Person> = service
            .select("SELECT * FROM people", Vec::new(), &CommandOptions::default())
            .await?;
        assert_eq!(
            found,
            vec![
                Person {
                    id: 1,
                    name: Some("alice".into())
                },
                Person { id: 2, name: None },
            ]
        );
        assert_eq!(handle.count(&MockEvent::ReaderClosed), 1);

        let empty: Vec<Person> = service
            .select("SELECT * FROM people", Vec::new(), &CommandOptions::default())
            .await?;
        assert!(empty.is_empty());

        let err = service
            .select_first::<Person>("SELECT * FROM people", Vec::new(), &CommandOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SqlProviderError::NoRows { .. }));

        let fallback: Person = service
            .select_first_or_default("SELECT * FROM people", Vec::new(), &CommandOptions::default())
            .await?;
        assert_eq!(fallback, Person::default());
        assert_eq!(handle.count(&MockEvent::ReaderClosed), 4);
        Ok::<(), SqlProviderError>(())
    })?;
    Ok(())
}

#[test]
fn test01_strict_mode_rejects_unconvertible_columns() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let bad = || {
            MockResponse::table(
                &["Id", "Name"],
                vec![vec![RowValues::Text("abc".into()), RowValues::Text("x".into())]],
            )
        };

        let (service, handle) = mock_service(DatabaseType::MySql)?;
        let mut lenient = service;
        handle.push_response(bad());
        let first: Person = lenient
            .select_first("SELECT Id, Name FROM people", Vec::new(), &CommandOptions::default())
            .await?;
        assert_eq!(first.id, 0);
        assert_eq!(first.name.as_deref(), Some("x"));

        let (service, handle) = mock_service(DatabaseType::MySql)?;
        let mut strict = service.with_mapping_mode(MappingMode::Strict);
        handle.push_response(bad());
        let err = strict
            .select_first::<Person>("SELECT Id, Name FROM people", Vec::new(), &CommandOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SqlProviderError::Mapping { .. }));
        assert_eq!(handle.count(&MockEvent::ReaderClosed), 1);
        Ok::<(), SqlProviderError>(())
    })?;
    Ok(())
}

#[test]
fn test01_reader_and_table() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let (mut service, handle) = mock_service(DatabaseType::MySql)?;
        handle.push_response(people());
        let mut reader = service
            .execute_reader("SELECT * FROM people", Vec::new(), &CommandOptions::default())
            .await?;
        assert!(reader.has_rows().await?);
        assert_eq!(reader.column_names().len(), 3);
        let row = reader.read().await?.expect("first row");
        assert_eq!(row.get("Name").and_then(RowValues::as_text), Some("alice"));
        reader.close().await?;
        reader.close().await?;
        assert!(reader.is_closed());
        assert_eq!(handle.count(&MockEvent::ReaderClosed), 1);
        drop(reader);

        handle.push_response(people());
        let table = service
            .execute_table("SELECT * FROM people", Vec::new(), &CommandOptions::default())
            .await?;
        assert_eq!(table.results.len(), 2);
        let mapped: Vec<Person> = table.map_rows(MappingMode::BestEffort)?;
        assert_eq!(mapped[1].id, 2);

        handle.push_response(MockResponse::table(&["n"], vec![vec![RowValues::Int(42)]]));
        let scalar = service
            .execute_scalar("SELECT COUNT(*) FROM people", Vec::new(), &CommandOptions::default())
            .await?;
        assert_eq!(scalar, Some(RowValues::Int(42)));

        let none = service
            .execute_scalar("SELECT 1 FROM people WHERE 0 = 1", Vec::new(), &CommandOptions::default())
            .await?;
        assert_eq!(none, None);
        Ok::<(), SqlProviderError>(())
    })?;
    Ok(())
}

#[test]
fn test01_inserts_recover_identity_per_backend() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let person = Person {
            id: 5,
            name: Some("bob".into()),
        };

        let (mut mysql, handle) = mock_service(DatabaseType::MySql)?;
        handle.push_response(MockResponse::rows_affected(1).with_last_insert_id(77));
        let result = mysql
            .execute_text_insert(&person, "people", &CommandOptions::default())
            .await?;
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.id_as_i64(), Some(77));
        let executed = &handle.executed()[0];
        assert_eq!(executed.sql, "INSERT INTO people (Id, Name) VALUES (@Id, @Name);");
        assert_eq!(executed.parameters.len(), 2);
        assert_eq!(executed.parameters[0].db_type, DbType::Int32);

        let (mut mssql, handle) = mock_service(DatabaseType::Mssql)?;
        handle.push_response(MockResponse::rows_affected(-1).with_outputs(vec![
            ("@ReturnedId", RowValues::Int(12)),
            ("@RowsAffected", RowValues::Int(1)),
        ]));
        let result = mssql
            .execute_text_insert(&person, "people", &CommandOptions::default())
            .await?;
        assert_eq!(
            result,
            InsertResult {
                rows_affected: 1,
                id: Some(RowValues::Int(12)),
            }
        );
        let executed = &handle.executed()[0];
        assert!(executed.sql.ends_with("SCOPE_IDENTITY()"));
        assert_eq!(executed.parameters.len(), 4);

        let err = mssql
            .execute_text_insert_params("people", Vec::new(), &CommandOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SqlProviderError::ParameterError(_)));
        Ok::<(), SqlProviderError>(())
    })?;
    Ok(())
}

#[test]
fn test01_output_parameters_come_back_on_the_command() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let (mut service, handle) = mock_service(DatabaseType::Mssql)?;
        let total = service.create_output_parameter("@total", DbType::Int32, true);
        let mut command = service
            .create_command("SELECT @total = COUNT(*) FROM people", vec![total], &CommandOptions::default())
            .await?;
        handle.push_response(MockResponse::rows_affected(-1).with_outputs(vec![("total", RowValues::Int(9))]));
        service.execute_command(&mut command).await?;
        assert_eq!(command.output_value("total"), Some(&RowValues::Int(9)));

        let foreign = sql_provider::parameter_for(DatabaseType::MySql)?;
        let err = service
            .execute_non_query("SELECT 1", vec![foreign], &CommandOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SqlProviderError::ParameterError(_)));
        Ok::<(), SqlProviderError>(())
    })?;
    Ok(())
}

#[test]
fn test01_cancellation_and_timeout() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let (mut service, handle) = mock_service(DatabaseType::MySql)?;

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        let err = service
            .execute_non_query(
                "DELETE FROM t",
                Vec::new(),
                &CommandOptions::default().with_cancel(cancelled),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SqlProviderError::Cancelled));
        assert!(handle.executed().is_empty());

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        handle.push_response(MockResponse::rows_affected(1).with_delay(Duration::from_secs(5)));
        let err = service
            .execute_non_query(
                "DELETE FROM t",
                Vec::new(),
                &CommandOptions::default().with_cancel(token),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SqlProviderError::Cancelled));

        handle.push_response(MockResponse::rows_affected(1).with_delay(Duration::from_secs(3)));
        let err = service
            .execute_non_query("DELETE FROM t", Vec::new(), &CommandOptions::default().with_timeout(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SqlProviderError::Timeout(1)));
        Ok::<(), SqlProviderError>(())
    })?;
    Ok(())
}

#[test]
fn test01_driver_failures_propagate() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let (mut service, handle) = mock_service(DatabaseType::MySql)?;
        handle.fail_next_open("refused");
        let err = service.open(None).await.unwrap_err();
        assert!(matches!(err, SqlProviderError::ConnectionError(_)));
        assert_eq!(service.state(), ConnectionState::Closed);

        handle.push_response(MockResponse::error("duplicate key"));
        let err = service
            .execute_non_query("INSERT INTO t VALUES (1)", Vec::new(), &CommandOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SqlProviderError::ExecutionError(m) if m == "duplicate key"));

        service.execute_batch("CREATE TABLE a (x INT); CREATE TABLE b (y INT);", None).await?;
        assert!(handle
            .events()
            .iter()
            .any(|e| matches!(e, MockEvent::Batch(sql) if sql.starts_with("CREATE TABLE a"))));
        Ok::<(), SqlProviderError>(())
    })?;
    Ok(())
}

#[test]
fn test01_blocking_select_fails_on_empty() -> Result<(), Box<dyn std::error::Error>> {
    let connection = MockConnection::new(DatabaseType::MySql);
    let handle = connection.handle();
    let config = ConnectionConfig::new(DatabaseType::MySql, "mock");
    let mut service = sql_provider::blocking::SqlService::from_connection(config, Box::new(connection))?;

    let err = service
        .select::<Person>("SELECT * FROM people", Vec::new(), &CommandOptions::default())
        .unwrap_err();
    assert!(matches!(err, SqlProviderError::NoRows { .. }));

    handle.push_response(people());
    let found: Vec<Person> = service.select("SELECT * FROM people", Vec::new(), &CommandOptions::default())?;
    assert_eq!(found.len(), 2);

    handle.push_response(people());
    let mut reader = service.execute_reader("SELECT * FROM people", Vec::new(), &CommandOptions::default())?;
    let first: Option<Person> = reader.map_first()?;
    reader.close()?;
    assert_eq!(first.map(|p| p.id), Some(1));
    Ok(())
}
