//! Workspace root package (tooling only; no code).
