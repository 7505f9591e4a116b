//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};
use tandem_core::TandemError;
use tandem_observability::logging::{log_format_gueltig, log_level_gueltig};
use tandem_signaling::SignalingConfig;

/// Umgebungsvariable, die den HTTP-Port ueberschreibt
pub const PORT_ENV: &str = "PORT";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Verbindungs-Einstellungen (Keepalive, Queues, Frames)
    pub verbindung: VerbindungsEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers (nur fuer Logs)
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Clients (TCP + WebSocket)
    pub max_clients: usize,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Tandem Server".into(),
            max_clients: 512,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer alle Listener
    pub bind_adresse: String,
    /// Port fuer den TCP-Transport (Frames)
    pub tcp_port: u16,
    /// Port fuer HTTP (WebSocket, Health, Metriken)
    pub http_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 9987,
            http_port: 3000,
        }
    }
}

/// Verbindungs-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerbindungsEinstellungen {
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Trennung nach so vielen Sekunden ohne Lebenszeichen
    pub timeout_sek: u64,
    /// Groesse der Send-Queue pro Sitzung
    pub send_queue_groesse: usize,
    /// Maximale Frame-Groesse fuer TCP in Bytes
    pub max_frame_groesse: usize,
}

impl Default for VerbindungsEinstellungen {
    fn default() -> Self {
        let signaling = SignalingConfig::default();
        Self {
            keepalive_sek: signaling.keepalive_sek,
            timeout_sek: signaling.verbindungs_timeout_sek,
            send_queue_groesse: signaling.send_queue_groesse,
            max_frame_groesse: signaling.max_frame_groesse,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Haengt `/health` und `/metrics` an den HTTP-Listener
    pub aktiviert: bool,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self { aktiviert: true }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    /// `PORT` aus der Umgebung ueberschreibt den HTTP-Port.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let mut config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };

        if let Ok(port) = std::env::var(PORT_ENV) {
            config.port_ueberschreiben(&port)?;
        }

        config.validieren()?;
        Ok(config)
    }

    /// Setzt den HTTP-Port aus einem String (z.B. aus `PORT`)
    pub fn port_ueberschreiben(&mut self, port: &str) -> tandem_core::Result<()> {
        let port: u16 = port.trim().parse().map_err(|_| {
            TandemError::Konfiguration(format!("{PORT_ENV}='{port}' ist kein gueltiger Port"))
        })?;
        self.netzwerk.http_port = port;
        Ok(())
    }

    /// Prueft die Konfiguration auf unsinnige Werte
    pub fn validieren(&self) -> tandem_core::Result<()> {
        if self.server.max_clients == 0 {
            return Err(TandemError::Konfiguration(
                "server.max_clients muss groesser als 0 sein".into(),
            ));
        }
        if self.verbindung.timeout_sek < self.verbindung.keepalive_sek {
            return Err(TandemError::Konfiguration(
                "verbindung.timeout_sek muss mindestens keepalive_sek sein".into(),
            ));
        }
        if self.verbindung.send_queue_groesse == 0 {
            return Err(TandemError::Konfiguration(
                "verbindung.send_queue_groesse muss groesser als 0 sein".into(),
            ));
        }
        if !log_level_gueltig(&self.logging.level) {
            return Err(TandemError::Konfiguration(format!(
                "unbekannter Log-Level '{}'",
                self.logging.level
            )));
        }
        if !log_format_gueltig(&self.logging.format) {
            return Err(TandemError::Konfiguration(format!(
                "unbekanntes Log-Format '{}'",
                self.logging.format
            )));
        }
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Gibt die vollstaendige Bind-Adresse fuer HTTP/WebSocket zurueck
    pub fn http_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.http_port)
    }

    /// Leitet die Konfiguration des Signaling-Service ab
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            max_clients: self.server.max_clients,
            keepalive_sek: self.verbindung.keepalive_sek,
            verbindungs_timeout_sek: self.verbindung.timeout_sek,
            send_queue_groesse: self.verbindung.send_queue_groesse,
            max_frame_groesse: self.verbindung.max_frame_groesse,
        }
    }
}
