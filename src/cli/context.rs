//! Everything a command needs: config, the authenticated client, stored
//! credentials, and the notice channel.

use std::error::Error;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::core::config::Config;
use crate::core::credentials::CredentialStore;
use crate::core::http::{ApiClient, LoginHook, LoginRedirect, ReqwestTransport};
use crate::core::keyring::KeyringAccessError;
use crate::core::notice::{drain, Notice, NoticeLevel, Notifier};
use crate::core::session::AuthService;

pub struct CliContext {
    pub config: Config,
    pub api_url: String,
    pub client: ApiClient,
    pub notifier: Notifier,
    transport: Arc<ReqwestTransport>,
    credentials: CredentialStore,
    notices: mpsc::UnboundedReceiver<Notice>,
}

fn print_login_redirect(redirect: &LoginRedirect) {
    eprintln!("🔒 Your session has expired. Log in at {}", redirect.login_url);
    match &redirect.return_to {
        Some(path) => eprintln!("   then run `readmegen login` to resume {path}."),
        None => eprintln!("   then run `readmegen login`."),
    }
}

impl CliContext {
    pub fn new(config: Config) -> Result<Self, Box<dyn Error>> {
        let api_url = config.api_url();
        let transport = Arc::new(ReqwestTransport::new(&api_url)?);
        let credentials = CredentialStore::new(config.use_keyring());

        match credentials.load(&api_url) {
            Ok(Some(cookies)) => transport.import_cookie_header(&cookies)?,
            Ok(None) => {}
            Err(err) => tolerate_keyring_error(err, "load stored session")?,
        }

        let hook: LoginHook = Arc::new(print_login_redirect);
        let client = ApiClient::builder(transport.clone(), &api_url)
            .login_hook(hook)
            .build();
        let (notifier, notices) = Notifier::channel();

        Ok(Self {
            config,
            api_url,
            client,
            notifier,
            transport,
            credentials,
            notices,
        })
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.client.clone())
    }

    /// Seeds the cookie jar from a header copied out of the browser.
    pub fn import_cookies(&self, header: &str) -> Result<(), Box<dyn Error>> {
        self.transport.import_cookie_header(header)?;
        Ok(())
    }

    /// Saves the jar's cookies, which a token reissue may have rotated.
    pub fn persist_session(&self) -> Result<(), Box<dyn Error>> {
        let Some(cookies) = self.transport.export_cookie_header() else {
            return Ok(());
        };
        if let Err(err) = self.credentials.save(&self.api_url, &cookies) {
            tolerate_keyring_error(err, "store session")?;
        }
        Ok(())
    }

    pub fn forget_session(&self) -> Result<bool, Box<dyn Error>> {
        match self.credentials.remove(&self.api_url) {
            Ok(removed) => Ok(removed),
            Err(err) => {
                tolerate_keyring_error(err, "remove stored session")?;
                Ok(false)
            }
        }
    }

    pub fn print_notices(&mut self) {
        for notice in drain(&mut self.notices) {
            match notice.level {
                NoticeLevel::Error => eprintln!("{notice}"),
                NoticeLevel::Success | NoticeLevel::Info => println!("{notice}"),
            }
        }
    }
}

fn tolerate_keyring_error(err: KeyringAccessError, action: &str) -> Result<(), Box<dyn Error>> {
    if err.is_recoverable() {
        warn!(error = %err, "Could not {action}; continuing without the keyring");
        Ok(())
    } else {
        Err(Box::new(err))
    }
}
