//! Where matched articles end up.

pub mod maildir;
pub mod mbox;

use log::warn;

use crate::domain::article::DeliveredMessage;
use crate::error::DeliveryError;

pub use maildir::MaildirSink;
pub use mbox::MboxSink;

/// Called once per matched article. Opening and closing whatever sits
/// behind it is the router's business.
pub trait DeliveryRouter {
    fn deliver(&mut self, msg: &DeliveredMessage) -> Result<(), DeliveryError>;
}

pub trait Mailbox {
    fn name(&self) -> String;
    fn add(&mut self, msg: &DeliveredMessage) -> Result<(), DeliveryError>;

    /// Flush and release anything held open. The sink reopens on the next
    /// `add`.
    fn close(&mut self) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// Fans each message out to every configured mailbox.
#[derive(Default)]
pub struct MailboxRouter {
    sinks: Vec<Box<dyn Mailbox>>,
}

impl MailboxRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl Mailbox + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// End of cycle. Every sink is closed even if an earlier one fails; the
    /// first failure is returned.
    pub fn close(&mut self) -> Result<(), DeliveryError> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.close() {
                warn!("{}: close failed: {e}", sink.name());
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl DeliveryRouter for MailboxRouter {
    fn deliver(&mut self, msg: &DeliveredMessage) -> Result<(), DeliveryError> {
        for sink in &mut self.sinks {
            sink.add(msg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<String>>>, &'static str);

    impl Mailbox for Recorder {
        fn name(&self) -> String {
            self.1.to_string()
        }
        fn add(&mut self, msg: &DeliveredMessage) -> Result<(), DeliveryError> {
            self.0.borrow_mut().push(format!("{}:{}", self.1, msg.message_id));
            Ok(())
        }
    }

    #[test]
    fn fans_out_to_every_sink() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut router = MailboxRouter::new()
            .with(Recorder(log.clone(), "maildir"))
            .with(Recorder(log.clone(), "mbox"));
        let msg = DeliveredMessage {
            date: "d".into(),
            from: "f".into(),
            message_id: "<1@x>".into(),
            body: vec![],
        };
        router.deliver(&msg).unwrap();
        router.close().unwrap();
        assert_eq!(*log.borrow(), vec!["maildir:<1@x>", "mbox:<1@x>"]);
    }
}
