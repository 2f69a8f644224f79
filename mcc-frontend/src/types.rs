//! Type model for the mcc compiler
//!
//! Sizes are in machine words of the 32-bit target. Floating values
//! report a size of two words even though the generated code works in
//! single precision; the code generator compensates where it matters.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Void,
    Boolean,
    Character,
    Integer,
    Floating,
    /// Array of elements; bounds live on the declaration, not the type
    Array(Box<Type>),
    Pointer(Box<Type>),
    /// Member types in declaration order
    Structure(Vec<Type>),
    Function {
        return_type: Box<Type>,
        parameters: Vec<Type>,
    },
}

impl Type {
    /// Size in words. An array variable holds a one-word descriptor (the
    /// address of its dynamic storage); a structure is the sum of its
    /// members.
    pub fn type_size(&self) -> usize {
        match self {
            Type::Void => 0,
            Type::Boolean | Type::Character | Type::Integer => 1,
            Type::Floating => 2,
            Type::Array(_) | Type::Pointer(_) => 1,
            Type::Structure(members) => members.iter().map(Type::type_size).sum(),
            Type::Function { .. } => 1,
        }
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Type::Floating)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn is_structure(&self) -> bool {
        matches!(self, Type::Structure(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Type::Boolean | Type::Character | Type::Integer | Type::Floating | Type::Pointer(_)
        )
    }

    /// Element type of an array or pointer
    pub fn element_type(&self) -> &Type {
        match self {
            Type::Array(element) | Type::Pointer(element) => element,
            other => other,
        }
    }

    pub fn member_amount(&self) -> usize {
        match self {
            Type::Structure(members) => members.len(),
            _ => 0,
        }
    }

    pub fn member_type(&self, index: usize) -> &Type {
        match self {
            Type::Structure(members) => &members[index],
            other => other,
        }
    }

    pub fn return_type(&self) -> &Type {
        match self {
            Type::Function { return_type, .. } => return_type,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_sizes() {
        assert_eq!(Type::Integer.type_size(), 1);
        assert_eq!(Type::Character.type_size(), 1);
        assert_eq!(Type::Floating.type_size(), 2);
        assert_eq!(Type::Pointer(Box::new(Type::Integer)).type_size(), 1);
    }

    #[test]
    fn test_structure_size_is_member_sum() {
        let ty = Type::Structure(vec![Type::Integer, Type::Floating, Type::Character]);
        assert_eq!(ty.type_size(), 4);
        assert_eq!(ty.member_amount(), 3);
        assert!(ty.member_type(1).is_floating());
    }

    #[test]
    fn test_function_return_type() {
        let ty = Type::Function {
            return_type: Box::new(Type::Floating),
            parameters: vec![Type::Integer],
        };
        assert!(ty.return_type().is_floating());
    }
}
