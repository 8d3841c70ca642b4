pub mod allocator;


pub use allocator::{BasketAllocator, BasketPlan, BranchStat, optimize};
