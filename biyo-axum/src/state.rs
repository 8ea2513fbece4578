use std::sync::Arc;

use biyo_core::BiyoApp;

pub struct BiyoAxumState<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    pub app: Arc<BiyoApp<R, P>>,
}

impl<R, P> Clone for BiyoAxumState<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
        }
    }
}
