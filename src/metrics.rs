use lazy_static::lazy_static;
use prometheus::{
    Histogram, IntCounter, IntGauge, register_histogram, register_int_counter, register_int_gauge,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: IntCounter =
        register_int_counter!("rate_gate_requests_total", "Total number of requests")
            .expect("metric registers once");
    pub static ref ADMITTED_TOTAL: IntCounter =
        register_int_counter!("rate_gate_admitted_total", "Requests that got a token")
            .expect("metric registers once");
    pub static ref REJECTED_TOTAL: IntCounter =
        register_int_counter!("rate_gate_rejected_total", "Requests rejected by the rate limit")
            .expect("metric registers once");
    pub static ref ADMISSION_WAIT: Histogram = register_histogram!(
        "rate_gate_admission_wait_seconds",
        "Time a request spent waiting for its admission decision"
    )
    .expect("metric registers once");
    pub static ref TRACKED_CLIENTS: IntGauge =
        register_int_gauge!("rate_gate_tracked_clients", "Clients with a live token dispenser")
            .expect("metric registers once");
    pub static ref EVICTED_CLIENTS: IntCounter = register_int_counter!(
        "rate_gate_evicted_clients_total",
        "Dispensers dropped from the registry"
    )
    .expect("metric registers once");
}
