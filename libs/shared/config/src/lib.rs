use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::warn;

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub server_host: IpAddr,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            server_host: Self::parse_var("SERVER_HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            server_port: Self::parse_var("SERVER_PORT", DEFAULT_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.server_host, self.server_port)
    }

    fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
        match env::var(name) {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("{} has an invalid value '{}', using default", name, raw);
                default
            }),
            Err(_) => default,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            server_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            server_port: DEFAULT_PORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_not_configured() {
        let config = AppConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.bind_address().port(), 3000);
    }

    #[test]
    fn test_configured_when_supabase_values_present() {
        let config = AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon".to_string(),
            supabase_jwt_secret: "secret".to_string(),
            ..AppConfig::default()
        };
        assert!(config.is_configured());
    }
}
