/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that are shared between the [dissemination](crate::dissemination) planner and the
//! [private data store](crate::pvtdata_store).

pub mod data_types;

pub mod collection;

pub mod pvt_data;

pub mod btl_policy;
