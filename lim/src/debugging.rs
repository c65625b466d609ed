// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

// Step-by-step traversal tracing.  Compiled away entirely unless the `copious-debugging` feature
// is enabled, since it fires on every node and edge that a preorder run touches.

#[cfg(feature = "copious-debugging")]
#[macro_export]
macro_rules! copious_debugging {
    ($($arg:tt)*) => {{ ::log::trace!(target: "lim::traversal", $($arg)*); }}
}

#[cfg(not(feature = "copious-debugging"))]
#[macro_export]
macro_rules! copious_debugging {
    ($($arg:tt)*) => {};
}
