//! Connection handling and statement execution.
//!
//! One connection is held for the whole run; `dryrun` logs the rendered
//! SQL (and bound parameters) instead of executing, and existence checks
//! report `false` so the engine walks the create path.

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, Params};
use tracing::{debug, info};

use crate::error::Result;

/// The run's database connection plus the dryrun flag.
pub struct DbConn {
    conn: Conn,
    pub dryrun: bool,
}

impl DbConn {
    /// Open a connection from a database URL.
    pub async fn connect(url: &str, dryrun: bool) -> Result<Self> {
        let opts = Opts::from_url(url).map_err(mysql_async::Error::from)?;
        let conn = Conn::new(opts).await?;
        Ok(Self { conn, dryrun })
    }

    /// Execute one statement.
    pub async fn execute(&mut self, sql: &str, params: Params) -> Result<()> {
        if self.dryrun {
            info!("[dryrun] {}", sql);
            if !matches!(params, Params::Empty) {
                info!("[dryrun] -- params: {:?}", params);
            }
            return Ok(());
        }
        debug!("execute: {}", sql);
        self.conn.exec_drop(sql, params).await?;
        Ok(())
    }

    /// Execute one prepared statement once per parameter set.
    pub async fn execute_batch(&mut self, sql: &str, params: Vec<Params>) -> Result<()> {
        if self.dryrun {
            info!("[dryrun] {}", sql);
            info!("[dryrun] -- {} parameter set(s)", params.len());
            return Ok(());
        }
        debug!("execute batch of {}: {}", params.len(), sql);
        self.conn.exec_batch(sql, params).await?;
        Ok(())
    }

    /// Fetch the first row, if any.
    pub async fn select_first(
        &mut self,
        sql: &str,
        params: Params,
    ) -> Result<Option<mysql_async::Row>> {
        if self.dryrun {
            info!("[dryrun] {}", sql);
            return Ok(None);
        }
        Ok(self.conn.exec_first(sql, params).await?)
    }

    /// Whether the query returns at least one row.
    pub async fn is_exist(&mut self, sql: &str, params: Params) -> Result<bool> {
        Ok(self.select_first(sql, params).await?.is_some())
    }

    /// Commit the current transaction.
    pub async fn commit(&mut self) -> Result<()> {
        if self.dryrun {
            info!("[dryrun] -- COMMIT");
            return Ok(());
        }
        self.conn.query_drop("COMMIT").await?;
        Ok(())
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        self.conn.disconnect().await?;
        Ok(())
    }
}
