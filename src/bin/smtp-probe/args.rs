use anyhow::{Result, bail};
use clap::Parser;
use smtp_probe::{ProbeOptions, ProbeTarget, ReadMode, ReplyCheck};

pub const EXAMPLE: &str = "Example: smtp-probe localhost 2525 test@example.com";

#[derive(Parser, Debug)]
#[command(name = "smtp-probe", version, about = "Send a test message through an SMTP server")]
pub struct Cli {
    /// hôte du serveur SMTP
    pub host: String,

    /// port du serveur SMTP (1-65535)
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// destinataire (RCPT TO)
    pub email_to: String,

    /// timeout connexion/lecture (ms, 0 = aucun)
    #[arg(long = "timeout", default_value_t = 5_000)]
    pub timeout_ms: u64,

    /// nom utilisé pour EHLO
    #[arg(long)]
    pub helo: Option<String>,

    /// enveloppe MAIL FROM
    #[arg(long = "from")]
    pub mail_from: Option<String>,

    /// sujet du message de test
    #[arg(long)]
    pub subject: Option<String>,

    /// continue même si MAIL FROM / RCPT TO ne répondent pas 250
    #[arg(long)]
    pub ignore_replies: bool,

    /// lit les réponses multi-lignes en entier
    #[arg(long)]
    pub full_replies: bool,

    /// taille du tampon de lecture (octets)
    #[arg(long, default_value_t = 1024)]
    pub buffer_size: usize,

    /// format: human|json
    #[arg(long, default_value = "human")]
    pub format: String,

    /// logs de debug sur stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn target(&self) -> Result<ProbeTarget> {
        Ok(ProbeTarget::new(
            self.host.as_str(),
            self.port,
            self.email_to.as_str(),
        )?)
    }

    pub fn options(&self) -> Result<ProbeOptions> {
        let mut options = ProbeOptions::default();
        if let Some(helo) = &self.helo {
            options.helo_domain = helo.clone();
        }
        if let Some(from) = &self.mail_from {
            options.mail_from = from.clone();
        }
        if let Some(subject) = &self.subject {
            options.subject = subject.clone();
        }
        options.timeout_ms = self.timeout_ms;
        options.read_buffer = self.buffer_size;
        options.read_mode = if self.full_replies {
            ReadMode::FullReply
        } else {
            ReadMode::SingleChunk
        };
        options.reply_check = if self.ignore_replies {
            ReplyCheck::Ignore
        } else {
            ReplyCheck::Enforce
        };
        options.validate()?;
        Ok(options)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Human,
    Json,
}

pub fn format_from_str(s: &str) -> Result<Format> {
    match s {
        "human" => Ok(Format::Human),
        "json" => Ok(Format::Json),
        other => bail!("unknown --format '{other}', use: human|json"),
    }
}
