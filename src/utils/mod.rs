// Utilities module
//
// This module contains common utility functions:
// - path: Request path cleaning and root containment
// - response: Small response builders shared by the handlers
// - validation: Common validation helpers

pub mod path;
pub mod response;
pub mod validation;
