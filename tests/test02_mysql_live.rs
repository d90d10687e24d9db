#![cfg(feature = "mysql")]

use sql_provider::prelude::*;

#[derive(Debug, Default, Clone, PartialEq)]
struct Account {
    id: i32,
    owner: String,
    balance: rust_decimal::Decimal,
}

sql_provider::map_row!(Account {
    id => "Id",
    owner => "Owner",
    balance => "Balance",
});

fn live_config() -> Option<ConnectionConfig> {
    let url = std::env::var("SQL_PROVIDER_MYSQL_URL").ok()?;
    Some(ConnectionConfig::new(DatabaseType::MySql, url).with_name("mysql-live"))
}

#[test]
fn test02_mysql_insert_select_and_transactions() -> Result<(), Box<dyn std::error::Error>> {
    let Some(config) = live_config() else {
        eprintln!("SQL_PROVIDER_MYSQL_URL not set; skipping");
        return Ok(());
    };
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut service = SqlService::new(config)?;
        service
            .execute_batch(
                "DROP TABLE IF EXISTS sp_accounts;
                 CREATE TABLE sp_accounts (
                     Id INT AUTO_INCREMENT PRIMARY KEY,
                     Owner VARCHAR(64) NOT NULL,
                     Balance DECIMAL(12, 2) NOT NULL
                 );",
                None,
            )
            .await?;

        let columns = vec![
            service.create_input_parameter("@Owner", RowValues::Text("alice".into()), DbType::String, false),
            service.create_input_parameter(
                "@Balance",
                RowValues::Decimal(rust_decimal::Decimal::new(1050, 2)),
                DbType::Decimal,
                false,
            ),
        ];
        let inserted = service
            .execute_text_insert_params("sp_accounts", columns, &CommandOptions::default())
            .await?;
        assert_eq!(inserted.rows_affected, 1);
        let id = inserted.id_as_i64().expect("generated id");
        assert!(id > 0);

        service.begin_transaction(None).await?;
        let owner = service.create_input_parameter("@owner", RowValues::Text("bob".into()), DbType::String, false);
        service
            .execute_non_query(
                "INSERT INTO sp_accounts (Owner, Balance) VALUES (@owner, 0)",
                vec![owner],
                &CommandOptions::default(),
            )
            .await?;
        service.rollback_transaction(None).await?;

        let accounts: Vec<Account> = service
            .select("SELECT Id, Owner, Balance FROM sp_accounts ORDER BY Id", Vec::new(), &CommandOptions::default())
            .await?;
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].owner, "alice");
        assert_eq!(accounts[0].balance, rust_decimal::Decimal::new(1050, 2));

        let wanted = service.create_input_parameter("@id", RowValues::Int(id), DbType::Int32, false);
        let count = service
            .execute_scalar(
                "SELECT COUNT(*) FROM sp_accounts WHERE Id = @id AND Owner <> '@id'",
                vec![wanted],
                &CommandOptions::default().with_prepare(true),
            )
            .await?;
        assert_eq!(count, Some(RowValues::Int(1)));

        service.begin_transaction(None).await?;
        let debited = service.create_input_parameter("@id", RowValues::Int(id), DbType::Int32, false);
        let updated = service
            .execute_non_query(
                "UPDATE sp_accounts SET Balance = Balance - 10 WHERE Id = @id",
                vec![debited],
                &CommandOptions::default(),
            )
            .await?;
        assert_eq!(updated, 1);
        service.commit_transaction(None).await?;

        let wanted = service.create_input_parameter("@id", RowValues::Int(id), DbType::Int32, false);
        let account: Account = service
            .select_first_or_default(
                "SELECT Id, Owner, Balance FROM sp_accounts WHERE Id = @id",
                vec![wanted],
                &CommandOptions::default(),
            )
            .await?;
        assert_eq!(account.owner, "alice");
        assert_eq!(account.balance, rust_decimal::Decimal::new(50, 2));

        service.execute_batch("DROP TABLE sp_accounts;", None).await?;
        service.close().await?;
        Ok::<(), SqlProviderError>(())
    })?;
    Ok(())
}
