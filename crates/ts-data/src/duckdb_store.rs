use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{params, params_from_iter, Connection};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use ts_types::alerts::{AlertKind, AlertRecord, TierCounts};
use ts_types::asset::{AssetObservation, PersistedAsset, RiskTier, ScoredAsset, SecuritySnapshot};
use ts_types::errors::{StoreError, StoreResult};
use uuid::Uuid;

use crate::store::Store;

const TOKEN_COLUMNS: &str = "address, name, symbol, market_cap, volume_24h, liquidity, \
     price_change_24h, holders, liquidity_locked, mint_disabled, freeze_disabled, \
     top10_holders, contract_age, observed_at, risk_score, risk_level, first_detected, \
     last_updated";

/// DuckDB-backed store. One connection guarded by a mutex; statements are
/// short and run inline.
pub struct DuckDbStore {
    connection: Mutex<Connection>,
    write_seq: AtomicU64,
}

impl std::fmt::Debug for DuckDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbStore")
            .field("write_seq", &self.write_seq.load(Ordering::Relaxed))
            .finish()
    }
}

impl DuckDbStore {
    /// Open or create a database file and ensure the schema exists.
    pub fn open<P: AsRef<Path>>(db_path: P) -> StoreResult<Self> {
        let connection = Connection::open(db_path).map_err(connection_error)?;
        Self::with_connection(connection)
    }

    /// Throwaway in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let connection = Connection::open_in_memory().map_err(connection_error)?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> StoreResult<Self> {
        connection
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS tokens (
                    address TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    symbol TEXT NOT NULL,
                    market_cap TEXT NOT NULL,
                    volume_24h TEXT NOT NULL,
                    liquidity TEXT NOT NULL,
                    price_change_24h TEXT NOT NULL,
                    holders BIGINT NOT NULL,
                    liquidity_locked BOOLEAN NOT NULL,
                    mint_disabled BOOLEAN NOT NULL,
                    freeze_disabled BOOLEAN NOT NULL,
                    top10_holders TEXT NOT NULL,
                    contract_age TEXT NOT NULL,
                    observed_at TEXT NOT NULL,
                    risk_score INTEGER NOT NULL,
                    risk_level TEXT NOT NULL,
                    first_detected TEXT NOT NULL,
                    last_updated TEXT NOT NULL,
                    write_seq BIGINT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS alerts (
                    id TEXT PRIMARY KEY,
                    token_address TEXT NOT NULL,
                    alert_type TEXT NOT NULL,
                    message TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    write_seq BIGINT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_alerts_created_at ON alerts(created_at);",
            )
            .map_err(connection_error)?;

        let last_seq: i64 = connection
            .query_row(
                "SELECT GREATEST(
                    (SELECT COALESCE(MAX(write_seq), 0) FROM tokens),
                    (SELECT COALESCE(MAX(write_seq), 0) FROM alerts))",
                [],
                |row| row.get(0),
            )
            .map_err(connection_error)?;

        Ok(Self {
            connection: Mutex::new(connection),
            write_seq: AtomicU64::new(last_seq.max(0) as u64 + 1),
        })
    }

    fn next_seq(&self) -> i64 {
        self.write_seq.fetch_add(1, Ordering::SeqCst) as i64
    }

    fn select_tokens(&self, sql: &str, args: &[String]) -> StoreResult<Vec<PersistedAsset>> {
        let connection = self.connection.lock();
        let mut stmt = connection.prepare(sql).map_err(|e| query_error(sql, e))?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), TokenRow::from_row)
            .map_err(|e| query_error(sql, e))?;

        let mut assets = Vec::new();
        for row in rows {
            let row = row.map_err(|e| query_error(sql, e))?;
            assets.push(row.into_asset()?);
        }
        Ok(assets)
    }
}

#[async_trait]
impl Store for DuckDbStore {
    async fn upsert_asset(&self, asset: PersistedAsset) -> StoreResult<PersistedAsset> {
        const UPSERT: &str = "INSERT INTO tokens (
                address, name, symbol, market_cap, volume_24h, liquidity, price_change_24h,
                holders, liquidity_locked, mint_disabled, freeze_disabled, top10_holders,
                contract_age, observed_at, risk_score, risk_level, first_detected,
                last_updated, write_seq)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (address) DO UPDATE SET
                name = excluded.name,
                symbol = excluded.symbol,
                market_cap = excluded.market_cap,
                volume_24h = excluded.volume_24h,
                liquidity = excluded.liquidity,
                price_change_24h = excluded.price_change_24h,
                holders = excluded.holders,
                liquidity_locked = excluded.liquidity_locked,
                mint_disabled = excluded.mint_disabled,
                freeze_disabled = excluded.freeze_disabled,
                top10_holders = excluded.top10_holders,
                contract_age = excluded.contract_age,
                observed_at = excluded.observed_at,
                risk_score = excluded.risk_score,
                risk_level = excluded.risk_level,
                last_updated = excluded.last_updated,
                write_seq = excluded.write_seq";
        const EXISTING: &str = "SELECT first_detected FROM tokens WHERE address = ?";

        let seq = self.next_seq();
        let connection = self.connection.lock();

        let existing: Option<String> = {
            let mut stmt = connection
                .prepare(EXISTING)
                .map_err(|e| query_error(EXISTING, e))?;
            let mut rows = stmt
                .query(params![asset.address()])
                .map_err(|e| query_error(EXISTING, e))?;
            match rows.next().map_err(|e| query_error(EXISTING, e))? {
                Some(row) => Some(row.get(0).map_err(|e| query_error(EXISTING, e))?),
                None => None,
            }
        };

        let mut stored = asset;
        if let Some(first_detected) = existing {
            stored.first_detected = parse_time("first_detected", &first_detected)?;
        }

        let obs = &stored.asset.observation;
        connection
            .execute(
                UPSERT,
                params![
                    obs.address,
                    obs.name,
                    obs.symbol,
                    obs.market_cap.to_string(),
                    obs.volume_24h.to_string(),
                    obs.liquidity.to_string(),
                    obs.price_change_24h.to_string(),
                    obs.holders as i64,
                    obs.security.liquidity_locked,
                    obs.security.mint_disabled,
                    obs.security.freeze_disabled,
                    obs.security.top10_holders.to_string(),
                    obs.security.contract_age.to_string(),
                    format_time(obs.timestamp),
                    stored.asset.risk_score as i32,
                    stored.asset.tier.as_str(),
                    format_time(stored.first_detected),
                    format_time(stored.last_updated),
                    seq,
                ],
            )
            .map_err(|e| query_error("upsert tokens", e))?;

        tracing::trace!(address = %stored.address(), seq, "asset upserted");
        Ok(stored)
    }

    async fn get_asset(&self, address: &str) -> StoreResult<Option<PersistedAsset>> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE address = ?");
        let mut found = self.select_tokens(&sql, &[address.to_string()])?;
        Ok(found.pop())
    }

    async fn insert_alert(&self, alert: AlertRecord) -> StoreResult<()> {
        let seq = self.next_seq();
        let connection = self.connection.lock();
        connection
            .execute(
                "INSERT INTO alerts (id, token_address, alert_type, message, created_at, write_seq)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    alert.id.to_string(),
                    alert.token_address,
                    alert.kind.as_str(),
                    alert.message,
                    format_time(alert.timestamp),
                    seq,
                ],
            )
            .map_err(|e| query_error("insert alerts", e))?;
        Ok(())
    }

    async fn query_assets(
        &self,
        limit: usize,
        tier: Option<RiskTier>,
    ) -> StoreResult<Vec<PersistedAsset>> {
        let (filter, args) = match tier {
            Some(tier) => ("WHERE risk_level = ?", vec![tier.as_str().to_string()]),
            None => ("", Vec::new()),
        };
        let sql = format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens {filter}
             ORDER BY last_updated DESC, write_seq DESC LIMIT {limit}"
        );
        self.select_tokens(&sql, &args)
    }

    async fn query_alerts(
        &self,
        limit: usize,
        kind: Option<AlertKind>,
    ) -> StoreResult<Vec<AlertRecord>> {
        let (filter, args) = match kind {
            Some(kind) => ("WHERE alert_type = ?", vec![kind.as_str().to_string()]),
            None => ("", Vec::new()),
        };
        let sql = format!(
            "SELECT id, token_address, alert_type, message, created_at FROM alerts {filter}
             ORDER BY created_at DESC, write_seq DESC LIMIT {limit}"
        );

        let connection = self.connection.lock();
        let mut stmt = connection.prepare(&sql).map_err(|e| query_error(&sql, e))?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(|e| query_error(&sql, e))?;

        let mut alerts = Vec::new();
        for row in rows {
            let (id, token_address, alert_type, message, created_at) =
                row.map_err(|e| query_error(&sql, e))?;
            alerts.push(AlertRecord {
                id: Uuid::parse_str(&id).map_err(|e| corrupt("id", &id, e))?,
                token_address,
                kind: AlertKind::from_str(&alert_type)
                    .map_err(|e| corrupt("alert_type", &alert_type, e))?,
                message,
                timestamp: parse_time("created_at", &created_at)?,
            });
        }
        Ok(alerts)
    }

    async fn counts_by_tier(&self) -> StoreResult<TierCounts> {
        const SQL: &str = "SELECT risk_level, COUNT(*) FROM tokens GROUP BY risk_level";

        let connection = self.connection.lock();
        let mut stmt = connection.prepare(SQL).map_err(|e| query_error(SQL, e))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(|e| query_error(SQL, e))?;

        let mut counts = TierCounts::default();
        for row in rows {
            let (level, count) = row.map_err(|e| query_error(SQL, e))?;
            let tier = RiskTier::from_str(&level).map_err(|e| corrupt("risk_level", &level, e))?;
            match tier {
                RiskTier::Safe => counts.safe = count as u64,
                RiskTier::Moderate => counts.moderate = count as u64,
                RiskTier::High => counts.high = count as u64,
            }
        }
        Ok(counts)
    }

    async fn alert_count(&self) -> StoreResult<u64> {
        const SQL: &str = "SELECT COUNT(*) FROM alerts";
        let connection = self.connection.lock();
        let count: i64 = connection
            .query_row(SQL, [], |row| row.get(0))
            .map_err(|e| query_error(SQL, e))?;
        Ok(count as u64)
    }

    fn name(&self) -> &str {
        "duckdb"
    }
}

/// Raw column values of one `tokens` row.
struct TokenRow {
    address: String,
    name: String,
    symbol: String,
    market_cap: String,
    volume_24h: String,
    liquidity: String,
    price_change_24h: String,
    holders: i64,
    liquidity_locked: bool,
    mint_disabled: bool,
    freeze_disabled: bool,
    top10_holders: String,
    contract_age: String,
    observed_at: String,
    risk_score: i32,
    risk_level: String,
    first_detected: String,
    last_updated: String,
}

impl TokenRow {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            address: row.get(0)?,
            name: row.get(1)?,
            symbol: row.get(2)?,
            market_cap: row.get(3)?,
            volume_24h: row.get(4)?,
            liquidity: row.get(5)?,
            price_change_24h: row.get(6)?,
            holders: row.get(7)?,
            liquidity_locked: row.get(8)?,
            mint_disabled: row.get(9)?,
            freeze_disabled: row.get(10)?,
            top10_holders: row.get(11)?,
            contract_age: row.get(12)?,
            observed_at: row.get(13)?,
            risk_score: row.get(14)?,
            risk_level: row.get(15)?,
            first_detected: row.get(16)?,
            last_updated: row.get(17)?,
        })
    }

    fn into_asset(self) -> StoreResult<PersistedAsset> {
        let observation = AssetObservation {
            market_cap: parse_decimal("market_cap", &self.market_cap)?,
            volume_24h: parse_decimal("volume_24h", &self.volume_24h)?,
            liquidity: parse_decimal("liquidity", &self.liquidity)?,
            price_change_24h: parse_decimal("price_change_24h", &self.price_change_24h)?,
            holders: u64::try_from(self.holders)
                .map_err(|e| corrupt("holders", &self.holders.to_string(), e))?,
            security: SecuritySnapshot {
                liquidity_locked: self.liquidity_locked,
                mint_disabled: self.mint_disabled,
                freeze_disabled: self.freeze_disabled,
                top10_holders: parse_decimal("top10_holders", &self.top10_holders)?,
                contract_age: parse_decimal("contract_age", &self.contract_age)?,
            },
            timestamp: parse_time("observed_at", &self.observed_at)?,
            address: self.address,
            name: self.name,
            symbol: self.symbol,
        };

        Ok(PersistedAsset {
            asset: ScoredAsset {
                observation,
                risk_score: u8::try_from(self.risk_score)
                    .map_err(|e| corrupt("risk_score", &self.risk_score.to_string(), e))?,
                tier: RiskTier::from_str(&self.risk_level)
                    .map_err(|e| corrupt("risk_level", &self.risk_level, e))?,
            },
            first_detected: parse_time("first_detected", &self.first_detected)?,
            last_updated: parse_time("last_updated", &self.last_updated)?,
        })
    }
}

// Fixed-width UTC timestamps so lexical order matches time order.
fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(column: &str, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(column, raw, e))
}

fn parse_decimal(column: &str, raw: &str) -> StoreResult<Decimal> {
    Decimal::from_str(raw).map_err(|e| corrupt(column, raw, e))
}

fn corrupt(column: &str, raw: &str, error: impl std::fmt::Display) -> StoreError {
    StoreError::Corruption {
        message: format!("column {column} holds {raw:?}: {error}"),
    }
}

fn connection_error(e: duckdb::Error) -> StoreError {
    StoreError::Connection {
        message: e.to_string(),
    }
}

fn query_error(query: &str, e: duckdb::Error) -> StoreError {
    StoreError::QueryFailed {
        query: query.to_string(),
        error: e.to_string(),
    }
}
