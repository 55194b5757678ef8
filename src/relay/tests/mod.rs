use super::*;
use crate::relay::test_helpers::{
    ScriptedClient, TEST_ENDPOINT, create_loaded_relay, create_test_relay, named_rows,
    wait_for_event,
};
use crate::types::{DeliveryOutcome, Event, RunState};
