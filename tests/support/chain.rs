use anyhow::{Result, anyhow};
use async_trait::async_trait;

use cachegate::cache::Chain;
use cachegate::request::Request;
use cachegate::response::Response;

/// A [`Chain`] that replays scripted responses and records what was sent.
pub struct ScriptedChain {
    request: Request,
    responses: Vec<Response>,
    pub sent: Vec<Request>,
    fail: bool,
}

impl ScriptedChain {
    /// A chain that panics the test (via an error) if the network is used.
    pub fn unreachable(request: Request) -> Self {
        Self {
            request,
            responses: Vec::new(),
            sent: Vec::new(),
            fail: false,
        }
    }

    pub fn replying(request: Request, responses: Vec<Response>) -> Self {
        Self {
            request,
            responses,
            sent: Vec::new(),
            fail: false,
        }
    }

    pub fn failing(request: Request) -> Self {
        Self {
            request,
            responses: Vec::new(),
            sent: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl Chain for ScriptedChain {
    fn request(&self) -> &Request {
        &self.request
    }

    async fn proceed(&mut self, request: Request) -> Result<Response> {
        self.sent.push(request);
        if self.fail {
            return Err(anyhow!("connection reset by peer"));
        }
        if self.responses.is_empty() {
            return Err(anyhow!("unexpected network call"));
        }
        Ok(self.responses.remove(0))
    }
}
