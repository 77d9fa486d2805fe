// Crate entry point. Re-export modules so tests and the binary can import
// them easily.
//
// Responsibilities
// - Only declare and expose modules. No business logic here.

pub mod core {
    pub mod brew;
    pub mod ports;
    pub mod sync;
}

pub mod application {
    pub mod connectivity;
    pub mod draft_store;
    pub mod orchestrator;
    pub mod subscriptions;
}

pub mod adapters {
    pub mod http {
        pub mod http_submit_brew;
    }
    pub mod in_memory {
        pub mod in_memory_key_value_store;
        pub mod in_memory_submit_brew;
    }
    pub mod json_file {
        pub mod json_file_key_value_store;
    }
}

pub mod shell {
    pub mod config;
}
