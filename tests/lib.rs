//! Integration test crate. Test files live alongside this stub.
