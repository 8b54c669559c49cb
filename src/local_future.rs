//! Running the worker's non-[`Send`] futures behind [`Send`] interfaces.
//!
//! Axum handlers and the [`crate::store::Store`] / [`crate::auth::AuthGateway`] traits require
//! [`Send`] futures, but JS-backed futures (D1, KV, `fetch`) are not. On wasm, [`local_future!`]
//! spawns the future on the local executor and awaits its result through a channel. Natively the
//! futures involved are already [`Send`], so the macro only wraps them.

/// Wraps the future so it is [`Send`], taking ownership of captured variables. Captures must be
/// `'static` on wasm.
#[cfg(target_arch = "wasm32")]
#[macro_export]
macro_rules! local_future {
    ($e:expr) => {
        $crate::local_future::LocalFuture::spawn(async move { { $e }.await })
    };
}

/// Wraps the future so it is [`Send`], taking ownership of captured variables. Captures must be
/// `'static` on wasm.
#[cfg(not(target_arch = "wasm32"))]
#[macro_export]
macro_rules! local_future {
    ($e:expr) => {
        async move { { $e }.await }
    };
}

#[cfg(target_arch = "wasm32")]
pub use wasm::LocalFuture;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::future::Future;

    use futures::channel::oneshot;
    use futures::FutureExt;

    /// Safely makes non-[`Send`] future [`Send`]able by spawning it on the local executor.
    pub struct LocalFuture<T>(oneshot::Receiver<T>);
    impl<T> LocalFuture<T>
    where
        T: 'static,
    {
        /// Wraps the future.
        pub fn spawn(future: impl Future<Output = T> + 'static) -> Self {
            let (send, recv) = oneshot::channel();
            wasm_bindgen_futures::spawn_local(async move {
                let out = future.await;
                // Receiver dropped means the request was abandoned.
                let _ = send.send(out);
            });
            Self(recv)
        }
    }
    impl<T> Future for LocalFuture<T> {
        type Output = T;

        fn poll(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Self::Output> {
            self.0
                .poll_unpin(cx)
                .map(|out| out.expect("local future was dropped before completing"))
        }
    }
}
