use anyhow::Context;

pub struct Config {
    pub database_url: String,
    /// Upper bound on pooled Postgres connections.
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to the school Postgres instance")?;

        let max_connections = match std::env::var("DASHBOARD_MAX_CONNECTIONS") {
            Ok(raw) => parse_max_connections(&raw)?,
            Err(_) => 5,
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

fn parse_max_connections(raw: &str) -> anyhow::Result<u32> {
    let value: u32 = raw
        .trim()
        .parse()
        .with_context(|| format!("DASHBOARD_MAX_CONNECTIONS must be a number, got {raw:?}"))?;
    if value == 0 {
        anyhow::bail!("DASHBOARD_MAX_CONNECTIONS must be at least 1");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connection_limit() {
        assert_eq!(parse_max_connections(" 8 ").unwrap(), 8);
        assert!(parse_max_connections("0").is_err());
        assert!(parse_max_connections("many").is_err());
    }
}
