use super::*;

/// Private keys tried, in order, when `use_known_keys` is set.
const DEFAULT_KEY_FILES: &[&str] = &["id_ed25519", "id_ecdsa", "id_rsa"];

/// Opens NETCONF sessions over the SSH `netconf` subsystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshConnector {
    level: SecurityLevel,
}

impl SshConnector {
    pub fn new(level: SecurityLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> SecurityLevel {
        self.level
    }
}

/// Existing default key files under `home/.ssh`, in preference order.
fn known_key_files(home: &std::path::Path) -> Vec<PathBuf> {
    DEFAULT_KEY_FILES
        .iter()
        .map(|name| home.join(".ssh").join(name))
        .filter(|path| path.is_file())
        .collect()
}

fn auth_method(params: &ConnectionParams) -> AuthMethod {
    if params.use_known_keys {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        if let Some(key) = home.and_then(|home| known_key_files(&home).into_iter().next()) {
            debug!("{} authenticating with key {}", params.device_addr(), key.display());
            return AuthMethod::with_key_file(key, None);
        }
        debug!(
            "{} no default key file found, falling back to password",
            params.device_addr()
        );
    }
    AuthMethod::with_password(&params.password)
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Transport>, NetconfError> {
        let transport = SshTransport::connect(params, self.level).await?;
        Ok(Box::new(transport))
    }
}

/// A NETCONF session on an SSH channel.
pub struct SshTransport {
    client: Client,
    channel: Channel<Msg>,
    decoder: FrameDecoder,
    capabilities: Vec<String>,
    session_id: Option<u32>,
    message_id: u64,
    device_addr: String,
}

impl SshTransport {
    /// Connects, starts the `netconf` subsystem and exchanges hellos.
    ///
    /// Chunked framing is selected when the device advertises base:1.1.
    pub async fn connect(
        params: &ConnectionParams,
        level: SecurityLevel,
    ) -> Result<SshTransport, NetconfError> {
        let device_addr = params.device_addr();
        let security_options = ConnectionSecurityOptions::for_params(level, params);

        let config = Config {
            preferred: security_options.preferred(),
            inactivity_timeout: Some(params.timeout().max(Duration::from_secs(60))),
            ..Default::default()
        };

        let client = Client::connect_with_config(
            (params.host.clone(), params.port),
            &params.username,
            auth_method(params),
            security_options.server_check.clone(),
            config,
        )
        .await?;
        debug!("{} TCP connection successful", device_addr);

        let channel = client.get_channel().await?;
        channel
            .request_subsystem(true, config::NETCONF_SUBSYSTEM)
            .await?;
        debug!("{} netconf subsystem requested", device_addr);

        let mut transport = SshTransport {
            client,
            channel,
            decoder: FrameDecoder::new(Framing::EndOfMessage),
            capabilities: Vec::new(),
            session_id: None,
            message_id: 0,
            device_addr,
        };

        transport.send(&rpc::client_hello()).await?;
        let hello = rpc::parse_hello(&transport.read_message().await?)?;
        if hello.supports(config::BASE_1_1) {
            transport.decoder.set_framing(Framing::Chunked);
        }
        debug!(
            "{} hello received, session-id {:?}, framing {:?}",
            transport.device_addr,
            hello.session_id,
            transport.decoder.framing()
        );
        transport.session_id = hello.session_id;
        transport.capabilities = hello.capabilities;
        Ok(transport)
    }

    pub fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    async fn send(&mut self, message: &str) -> Result<(), NetconfError> {
        trace!("{} >> {}", self.device_addr, message);
        let framed = framing::encode(self.decoder.framing(), message);
        self.channel.data(&framed[..]).await?;
        Ok(())
    }

    async fn read_message(&mut self) -> Result<String, NetconfError> {
        loop {
            if let Some(message) = self.decoder.next_message()? {
                trace!("{} << {}", self.device_addr, message);
                return Ok(message);
            }
            match self.channel.wait().await {
                Some(ChannelMsg::Data { ref data }) => self.decoder.push(data),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => {
                    trace!(
                        "{} stderr: {}",
                        self.device_addr,
                        String::from_utf8_lossy(data)
                    );
                }
                Some(ChannelMsg::Failure) => {
                    return Err(NetconfError::Protocol(format!(
                        "{} rejected the netconf subsystem request",
                        self.device_addr
                    )));
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    debug!("{} exited with status code: {}", self.device_addr, exit_status);
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(NetconfError::Protocol(format!(
                        "{} closed the channel with {} bytes unread",
                        self.device_addr,
                        self.decoder.pending()
                    )));
                }
                Some(_) => {}
            }
        }
    }

    async fn call(&mut self, operation: &str) -> Result<RpcReply, NetconfError> {
        self.message_id += 1;
        let message_id = self.message_id;
        self.send(&rpc::rpc(message_id, operation)).await?;
        let reply = self.read_message().await?;
        rpc::parse_reply(&reply, message_id)
    }
}

#[async_trait]
impl Transport for SshTransport {
    fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    async fn get_config(
        &mut self,
        source: Datastore,
        filter: &str,
    ) -> Result<String, NetconfError> {
        match self.call(&rpc::get_config(source, filter)).await? {
            RpcReply::Data(data) => Ok(data),
            RpcReply::Ok => Err(NetconfError::Protocol(
                "get-config reply carries no <data>".to_string(),
            )),
        }
    }

    async fn edit_config(&mut self, target: Datastore, config: &str) -> Result<(), NetconfError> {
        self.call(&rpc::edit_config(target, config)).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), NetconfError> {
        self.call(rpc::commit()).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), NetconfError> {
        debug!("{} closing NETCONF session", self.device_addr);
        let result = self.call(rpc::close_session()).await.map(|_| ());
        if let Err(e) = self.channel.eof().await {
            debug!("{} failed to send EOF: {:?}", self.device_addr, e);
        }
        if let Err(e) = self.client.disconnect().await {
            debug!("{} failed to disconnect: {:?}", self.device_addr, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_key_files_follow_preference_order() {
        let home = tempfile::tempdir().expect("tempdir");
        let ssh = home.path().join(".ssh");
        std::fs::create_dir(&ssh).expect("mkdir .ssh");
        std::fs::write(ssh.join("id_rsa"), "rsa").expect("write rsa");
        std::fs::write(ssh.join("id_ed25519"), "ed25519").expect("write ed25519");

        let keys = known_key_files(home.path());
        assert_eq!(keys, vec![ssh.join("id_ed25519"), ssh.join("id_rsa")]);
    }

    #[test]
    fn no_key_files_without_ssh_directory() {
        let home = tempfile::tempdir().expect("tempdir");
        assert!(known_key_files(home.path()).is_empty());
    }

    #[test]
    fn default_connector_is_secure() {
        assert_eq!(SshConnector::default().level(), SecurityLevel::Secure);
    }
}
