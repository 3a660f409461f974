//! Frame enrichment applied after the connection has set its own headers.
//!
//! The connection freezes every frame before handing it to a decorator, so
//! a decorator can add headers and a payload but cannot override anything
//! the protocol layer already set.

use stompkit_frame::{Frame, FrameError, HeaderType};

/// Mutates an outbound frame before it is sent.
pub trait FrameDecorator {
    fn decorate(&self, frame: &mut Frame) -> Result<(), FrameError>;

    /// Apply `self`, then `next`.
    fn and_then<N: FrameDecorator>(self, next: N) -> DecoratorChain<Self, N>
    where
        Self: Sized,
    {
        DecoratorChain {
            first: self,
            second: next,
        }
    }
}

impl<F> FrameDecorator for F
where
    F: Fn(&mut Frame) -> Result<(), FrameError>,
{
    fn decorate(&self, frame: &mut Frame) -> Result<(), FrameError> {
        self(frame)
    }
}

/// Build a decorator from a closure, fixing its signature for inference.
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&mut Frame) -> Result<(), FrameError>,
{
    f
}

/// Decorator that sets only the payload.
pub fn with_payload(payload: impl Into<String>) -> impl FrameDecorator {
    let payload = payload.into();
    from_fn(move |frame| {
        frame.set_payload(payload.as_str())?;
        Ok(())
    })
}

/// Leaves the frame untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDecoration;

impl FrameDecorator for NoDecoration {
    fn decorate(&self, _frame: &mut Frame) -> Result<(), FrameError> {
        Ok(())
    }
}

/// Two decorators applied in order.
#[derive(Debug, Clone)]
pub struct DecoratorChain<A, B> {
    first: A,
    second: B,
}

impl<A: FrameDecorator, B: FrameDecorator> FrameDecorator for DecoratorChain<A, B> {
    fn decorate(&self, frame: &mut Frame) -> Result<(), FrameError> {
        self.first.decorate(frame)?;
        self.second.decorate(frame)
    }
}

/// Injects the active transaction id after the caller's decoration.
///
/// A caller that sets `transaction` itself is rejected with
/// [`FrameError::ReservedHeader`]; the order (caller first, then this check)
/// is what lets the veto see the caller's headers.
pub struct TransactionDecorator<'a, D: ?Sized> {
    transaction_id: &'a str,
    caller: &'a D,
}

impl<'a, D: FrameDecorator + ?Sized> TransactionDecorator<'a, D> {
    pub fn new(transaction_id: &'a str, caller: &'a D) -> Self {
        Self {
            transaction_id,
            caller,
        }
    }
}

impl<D: FrameDecorator + ?Sized> FrameDecorator for TransactionDecorator<'_, D> {
    fn decorate(&self, frame: &mut Frame) -> Result<(), FrameError> {
        self.caller.decorate(frame)?;
        if frame.header(HeaderType::Transaction).is_some() {
            return Err(FrameError::ReservedHeader(
                HeaderType::Transaction.name().to_string(),
            ));
        }
        frame.set_header(HeaderType::Transaction, self.transaction_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use stompkit_frame::Command;

    use super::*;

    fn send_frame() -> Frame {
        let mut frame = Frame::new(Command::Send);
        frame
            .set_header(HeaderType::Destination, "/queue/a")
            .expect("destination is legal on SEND");
        frame.freeze();
        frame
    }

    #[test]
    fn closure_decorator_sets_payload() {
        let mut frame = send_frame();
        with_payload("body").decorate(&mut frame).unwrap();
        assert_eq!(frame.payload(), Some("body"));
        assert_eq!(frame.content_length(), Some(4));
    }

    #[test]
    fn frozen_header_cannot_be_overridden() {
        let mut frame = send_frame();
        let err = from_fn(|frame| {
            frame.set_header(HeaderType::Destination, "/queue/other")?;
            Ok(())
        })
        .decorate(&mut frame)
        .unwrap_err();
        assert!(matches!(err, FrameError::FrozenHeader(name) if name == "destination"));
    }

    #[test]
    fn chain_applies_in_order() {
        let mut frame = send_frame();
        let chain = from_fn(|frame| {
            frame.set_custom_header("x-step", "one")?;
            Ok(())
        })
        .and_then(from_fn(|frame| {
            let seen = frame.get("x-step").unwrap_or_default().to_string();
            frame.set_payload(format!("after {seen}"))?;
            Ok(())
        }));

        chain.decorate(&mut frame).unwrap();
        assert_eq!(frame.payload(), Some("after one"));
    }

    #[test]
    fn transaction_decorator_injects_id() {
        let mut frame = send_frame();
        let caller = with_payload("hi");
        TransactionDecorator::new("tx-1", &caller)
            .decorate(&mut frame)
            .unwrap();
        assert_eq!(frame.header(HeaderType::Transaction), Some("tx-1"));
        assert_eq!(frame.payload(), Some("hi"));
    }

    #[test]
    fn transaction_decorator_vetoes_caller_transaction() {
        let mut frame = send_frame();
        let caller = from_fn(|frame| {
            frame.set_header(HeaderType::Transaction, "mine")?;
            Ok(())
        });
        let err = TransactionDecorator::new("tx-1", &caller)
            .decorate(&mut frame)
            .unwrap_err();
        assert!(matches!(err, FrameError::ReservedHeader(name) if name == "transaction"));
    }

    #[test]
    fn no_decoration_is_identity() {
        let mut frame = send_frame();
        NoDecoration.decorate(&mut frame).unwrap();
        assert_eq!(frame, send_frame());
    }
}
