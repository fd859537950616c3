// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes built on [`crate::define_id!`].

crate::define_id! {
    /// Identifies the workflow a digest cache coordinator belongs to.
    ///
    /// Used to address per-workflow rows in the persistence gateway; two
    /// workflows never share a coordinator or a row namespace.
    pub struct WorkflowId("wkf-");
}

crate::define_id! {
    /// Correlates a resolver response with the request that produced it.
    pub struct RequestId("req-");
}
