pub mod error;
pub mod http;
pub mod line_items;
pub mod metrics;
pub mod peers;
pub mod provider;
pub mod reconciliation;
pub mod repository;

pub use error::{PaymentError, UpstreamFailure};
pub use http::build_client;
pub use line_items::LineItemAggregator;
pub use metrics::{get_metrics, init_metrics};
pub use peers::{
    OrderClient, OrderLineClient, OrderLineService, OrderService, ProductClient, ProductService,
    ServiceIdentity,
};
pub use provider::{MercadoPagoClient, ProviderStatus, QrCodeProvider};
pub use reconciliation::PaymentService;
pub use repository::{InMemoryPaymentRepository, PaymentRepository, PaymentStore};
