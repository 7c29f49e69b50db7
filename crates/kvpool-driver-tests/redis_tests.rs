//! Redis driver tests: connecting, commands and reply conversion

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::{Context, Result};
    use kvpool_core::{ConnectionFactory, Endpoint, KvError, Reply};
    use kvpool_driver_redis::RedisConnector;
    use pretty_assertions::assert_eq;

    use crate::fixtures::{TestServer, test_server};

    fn endpoint(host: &str, port: u16) -> Endpoint {
        Endpoint::new(host, port).with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_connect_and_ping() -> Result<()> {
        let info = test_server(TestServer::Open).await?;
        let conn = RedisConnector::new()
            .connect(&endpoint(&info.host, info.port))
            .await
            .context("connect failed")?;

        assert_eq!(conn.driver_name(), "redis");
        conn.ping().await.context("PING failed")?;
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_command_replies() -> Result<()> {
        let info = test_server(TestServer::Open).await?;
        let conn = RedisConnector::new()
            .connect(&endpoint(&info.host, info.port))
            .await?;

        assert_eq!(
            conn.command("SET", &["kvpool:test:replies", "hello"]).await?,
            Reply::Okay
        );
        assert_eq!(
            conn.command("GET", &["kvpool:test:replies"]).await?,
            Reply::Data(b"hello".to_vec())
        );
        assert_eq!(
            conn.command("INCRBY", &["kvpool:test:counter", "5"]).await?,
            Reply::Int(5)
        );
        assert_eq!(
            conn.command("GET", &["kvpool:test:missing"]).await?,
            Reply::Nil
        );

        conn.command("RPUSH", &["kvpool:test:list", "a", "b"]).await?;
        let list = conn.command("LRANGE", &["kvpool:test:list", "0", "-1"]).await?;
        assert_eq!(
            list,
            Reply::Array(vec![Reply::Data(b"a".to_vec()), Reply::Data(b"b".to_vec())])
        );

        conn.command(
            "DEL",
            &["kvpool:test:replies", "kvpool:test:counter", "kvpool:test:list"],
        )
        .await?;
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_unknown_command_is_command_error() -> Result<()> {
        let info = test_server(TestServer::Open).await?;
        let conn = RedisConnector::new()
            .connect(&endpoint(&info.host, info.port))
            .await?;

        let err = conn.command("NOSUCHCOMMAND", &[]).await.unwrap_err();
        assert!(matches!(err, KvError::Command(_)), "got {err:?}");
        assert!(!conn.is_closed());
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_closed_connection_rejects_commands() -> Result<()> {
        let info = test_server(TestServer::Open).await?;
        let conn = RedisConnector::new()
            .connect(&endpoint(&info.host, info.port))
            .await?;

        conn.close().await?;
        assert!(conn.is_closed());
        assert!(conn.command("PING", &[]).await.is_err());
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_authentication() -> Result<()> {
        let info = test_server(TestServer::Authenticated).await?;
        let password = info.password.clone().context("password")?;
        let conn = RedisConnector::new()
            .connect(&endpoint(&info.host, info.port))
            .await?;

        let err = conn.authenticate("wrong-password").await.unwrap_err();
        assert!(matches!(err, KvError::Authentication(_)), "got {err:?}");

        conn.authenticate(&password).await?;
        conn.ping().await?;
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_database_selection() -> Result<()> {
        let info = test_server(TestServer::Open).await?;
        let connector = RedisConnector::new();
        let db0 = connector.connect(&endpoint(&info.host, info.port)).await?;
        let db3 = connector
            .connect(&endpoint(&info.host, info.port).with_database(3))
            .await?;

        db3.command("SET", &["kvpool:test:db", "three"]).await?;
        assert_eq!(db0.command("GET", &["kvpool:test:db"]).await?, Reply::Nil);
        assert_eq!(
            db3.command("GET", &["kvpool:test:db"]).await?,
            Reply::Data(b"three".to_vec())
        );
        db3.command("DEL", &["kvpool:test:db"]).await?;
        Ok(())
    }
}
