/*
 * This file is part of rax.
 *
 * rax is a free and open-source in-memory radix tree engine.
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

use core::fmt;

pub type RaxResult<T> = Result<T, RaxError>;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
/// Recoverable failure modes for the mutating surface of a [`crate::Tree`]
pub enum RaxError {
    /// An internal allocation failed while servicing the call. The tree is left exactly as it
    /// was before the call: any node allocated past this point is freed before the error is
    /// returned, and no reachable node is mutated until every allocation the operation needs
    /// has succeeded.
    AllocationFailure,
    /// The path stack needed by this call failed to grow. The sticky OOM flag on the stack is
    /// set; subsequent calls that require a stack fail fast with this same error until a fresh
    /// stack is used.
    StackOom,
}

impl fmt::Display for RaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailure => write!(f, "allocation failure"),
            Self::StackOom => write!(f, "path stack failed to grow"),
        }
    }
}

impl std::error::Error for RaxError {}
